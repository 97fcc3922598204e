//! Arena-based state hierarchy tree.
//!
//! States are nodes in a tree owned by a [`StateTree`] arena and addressed
//! by [`StateId`] handles. Children hold a parent index instead of a
//! reference, which keeps ancestor walks (and least-common-ancestor
//! computation) cheap without shared mutable ownership between levels.

use crate::core::event::{ArgValue, DataKind};
use serde::{Deserialize, Serialize};

/// Stable handle to a state node inside a [`StateTree`].
///
/// Ids are arena indices: they are only meaningful for the tree (and the
/// machine) that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(pub(crate) usize);

impl StateId {
    /// Raw arena index, used by the description surface.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a composite node activates its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildMode {
    /// Exactly one child is active at a time; a designated initial child
    /// is required once the node has children.
    Sequential,

    /// All children are active together, each forming an independent
    /// region. Parallel nodes have no initial child.
    Parallel,
}

/// Structural role of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Plain,

    /// A leaf that may carry no outgoing transitions. Activating a final
    /// node directly under the root finishes the machine.
    Final,
}

/// A single node of the state hierarchy.
///
/// Runtime fields (`active`, `data`) are mutated only by the entry/exit
/// sequencer; structure is frozen once the owning machine is built.
pub struct StateNode {
    name: Option<String>,
    parent: Option<StateId>,
    children: Vec<StateId>,
    mode: ChildMode,
    initial: Option<StateId>,
    kind: NodeKind,
    data_kind: Option<DataKind>,
    active: bool,
    data: Option<ArgValue>,
}

impl StateNode {
    fn new(name: Option<String>, parent: Option<StateId>, mode: ChildMode, kind: NodeKind) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            mode,
            initial: None,
            kind,
            data_kind: None,
            active: false,
            data: None,
        }
    }
}

/// Arena owning every node of one machine's hierarchy.
pub struct StateTree {
    nodes: Vec<StateNode>,
}

impl std::fmt::Debug for StateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The data slot is type-erased; show only whether it is filled.
        f.debug_struct("StateNode")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("mode", &self.mode)
            .field("initial", &self.initial)
            .field("kind", &self.kind)
            .field("active", &self.active)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

impl std::fmt::Debug for StateTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.nodes).finish()
    }
}

impl StateTree {
    /// Create a tree holding only the root node.
    pub(crate) fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![StateNode::new(
                Some(root_name.into()),
                None,
                ChildMode::Sequential,
                NodeKind::Plain,
            )],
        }
    }

    /// The root node. Always valid.
    pub fn root(&self) -> StateId {
        StateId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false // a tree always has its root
    }

    pub fn contains(&self, id: StateId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Ids of every node, root first, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.nodes.len()).map(StateId)
    }

    fn node(&self, id: StateId) -> &StateNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: StateId) -> &mut StateNode {
        &mut self.nodes[id.0]
    }

    // -- structure (pub(crate): the builder is the only mutator) ----------

    pub(crate) fn add_child(
        &mut self,
        parent: StateId,
        name: Option<String>,
        mode: ChildMode,
        kind: NodeKind,
    ) -> StateId {
        debug_assert!(self.contains(parent));
        let id = StateId(self.nodes.len());
        self.nodes.push(StateNode::new(name, Some(parent), mode, kind));
        self.node_mut(parent).children.push(id);
        id
    }

    pub(crate) fn set_initial(&mut self, parent: StateId, child: StateId) {
        self.node_mut(parent).initial = Some(child);
    }

    pub(crate) fn set_data_kind(&mut self, id: StateId, kind: DataKind) {
        self.node_mut(id).data_kind = Some(kind);
    }

    // -- queries -----------------------------------------------------------

    pub fn name(&self, id: StateId) -> Option<&str> {
        self.node(id).name.as_deref()
    }

    /// Name if present, otherwise the id rendered as `#n`.
    pub fn display_name(&self, id: StateId) -> String {
        match self.name(id) {
            Some(name) => name.to_owned(),
            None => id.to_string(),
        }
    }

    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.node(id).parent
    }

    pub fn children(&self, id: StateId) -> &[StateId] {
        &self.node(id).children
    }

    pub fn mode(&self, id: StateId) -> ChildMode {
        self.node(id).mode
    }

    pub fn kind(&self, id: StateId) -> NodeKind {
        self.node(id).kind
    }

    pub fn is_final(&self, id: StateId) -> bool {
        self.node(id).kind == NodeKind::Final
    }

    pub fn initial(&self, id: StateId) -> Option<StateId> {
        self.node(id).initial
    }

    pub fn data_kind(&self, id: StateId) -> Option<&DataKind> {
        self.node(id).data_kind.as_ref()
    }

    pub fn is_leaf(&self, id: StateId) -> bool {
        self.node(id).children.is_empty()
    }

    /// Walk from `id`'s parent up to the root, nearest ancestor first.
    pub fn ancestors(&self, id: StateId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// True if `ancestor` lies strictly above `id`.
    pub fn is_ancestor(&self, ancestor: StateId, id: StateId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Least common ancestor of two nodes.
    ///
    /// Either node may itself be the LCA (when one contains the other).
    /// The root is an ancestor of everything, so this always resolves.
    pub fn lca(&self, a: StateId, b: StateId) -> StateId {
        let mut chain = vec![a];
        chain.extend(self.ancestors(a));
        let mut candidate = b;
        loop {
            if chain.contains(&candidate) {
                return candidate;
            }
            match self.parent(candidate) {
                Some(parent) => candidate = parent,
                None => return self.root(),
            }
        }
    }

    /// Path from `ancestor` (exclusive) down to `id` (inclusive),
    /// ancestor-first. Empty when `id == ancestor`.
    pub fn path_from(&self, ancestor: StateId, id: StateId) -> Vec<StateId> {
        let mut path = Vec::new();
        let mut cursor = id;
        while cursor != ancestor {
            path.push(cursor);
            match self.parent(cursor) {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    // -- runtime state -----------------------------------------------------

    pub fn is_active(&self, id: StateId) -> bool {
        self.node(id).active
    }

    pub fn data(&self, id: StateId) -> Option<&ArgValue> {
        self.node(id).data.as_ref()
    }

    pub(crate) fn activate(&mut self, id: StateId) {
        self.node_mut(id).active = true;
    }

    pub(crate) fn deactivate(&mut self, id: StateId) {
        let node = self.node_mut(id);
        node.active = false;
        node.data = None;
    }

    pub(crate) fn bind_data(&mut self, id: StateId, value: ArgValue) {
        self.node_mut(id).data = Some(value);
    }

    pub(crate) fn deactivate_all(&mut self) {
        for node in &mut self.nodes {
            node.active = false;
            node.data = None;
        }
    }

    /// Currently active states, preorder (parents before children,
    /// children in document order).
    pub fn active_states(&self) -> Vec<StateId> {
        let mut out = Vec::new();
        self.collect_active_preorder(self.root(), &mut out);
        out
    }

    fn collect_active_preorder(&self, id: StateId, out: &mut Vec<StateId>) {
        if !self.is_active(id) {
            return;
        }
        out.push(id);
        for &child in self.children(id) {
            self.collect_active_preorder(child, out);
        }
    }

    /// Active states with no active child — one per independent region.
    pub fn active_leaves(&self) -> Vec<StateId> {
        self.active_states()
            .into_iter()
            .filter(|&id| !self.children(id).iter().any(|&c| self.is_active(c)))
            .collect()
    }

    /// Active descendants of `domain` (the domain itself excluded),
    /// deepest-first, ready to be exited in order.
    pub fn active_descendants_postorder(&self, domain: StateId) -> Vec<StateId> {
        let mut out = Vec::new();
        for &child in self.children(domain) {
            self.collect_active_postorder(child, &mut out);
        }
        out
    }

    fn collect_active_postorder(&self, id: StateId, out: &mut Vec<StateId>) {
        if !self.is_active(id) {
            return;
        }
        for &child in self.children(id) {
            self.collect_active_postorder(child, out);
        }
        out.push(id);
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    tree: &'a StateTree,
    next: Option<StateId>,
}

impl Iterator for Ancestors<'_> {
    type Item = StateId;

    fn next(&mut self) -> Option<StateId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
