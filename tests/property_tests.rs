//! Property-based tests for the tree model and activation invariants.
//!
//! These tests use proptest to verify structural properties hold across
//! many randomly generated hierarchies.

use proptest::prelude::*;
use statree::{EventKind, MachineBuilder, StateId, StateMachine};

/// Randomly generated tree shape (structure only, no transitions).
#[derive(Clone, Debug)]
enum Shape {
    Leaf,
    Sequential(Vec<Shape>),
    Parallel(Vec<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = Just(Shape::Leaf);
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Shape::Sequential),
            prop::collection::vec(inner, 1..4).prop_map(Shape::Parallel),
        ]
    })
}

fn add_shape(
    builder: &mut MachineBuilder,
    parent: StateId,
    shape: &Shape,
    ids: &mut Vec<StateId>,
) {
    let name = format!("s{}", ids.len());
    match shape {
        Shape::Leaf => {
            let id = builder.add_state(parent, name).unwrap();
            ids.push(id);
        }
        Shape::Sequential(children) => {
            let id = builder.add_state(parent, name).unwrap();
            ids.push(id);
            let mut first = None;
            for child in children {
                let before = ids.len();
                add_shape(builder, id, child, ids);
                if first.is_none() {
                    first = Some(ids[before]);
                }
            }
            if let Some(first) = first {
                builder.set_initial(id, first).unwrap();
            }
        }
        Shape::Parallel(children) => {
            let id = builder.add_parallel_state(parent, name).unwrap();
            ids.push(id);
            for child in children {
                add_shape(builder, id, child, ids);
            }
        }
    }
}

/// Build a runnable machine from a shape; returns every state id.
fn machine_from(shape: &Shape) -> (StateMachine, Vec<StateId>) {
    let mut builder = MachineBuilder::new("root");
    let root = builder.root();
    let mut ids = vec![root];
    let before = ids.len();
    add_shape(&mut builder, root, shape, &mut ids);
    let top = ids[before];
    builder.set_initial(root, top).unwrap();
    (builder.build().unwrap(), ids)
}

/// The configuration invariant, checked over the public tree view: active
/// nodes lie on root paths, sequential composites hold exactly one active
/// child, parallel nodes hold all of them.
fn assert_activation_invariant(machine: &StateMachine, ids: &[StateId]) {
    let tree = machine.tree();
    for &id in ids {
        let children = tree.children(id);
        let active_children = children.iter().filter(|&&c| tree.is_active(c)).count();
        if tree.is_active(id) {
            if let Some(parent) = tree.parent(id) {
                assert!(tree.is_active(parent), "active node with inactive parent");
            }
            match tree.mode(id) {
                statree::ChildMode::Sequential => {
                    if !children.is_empty() {
                        assert_eq!(active_children, 1, "sequential composite needs one active child");
                    }
                }
                statree::ChildMode::Parallel => {
                    assert_eq!(active_children, children.len(), "parallel node must activate every region");
                }
            }
        } else {
            assert_eq!(active_children, 0, "inactive node with active children");
        }
    }
}

fn segments_to_kind(segments: &[String]) -> EventKind {
    EventKind::new(segments.join("."))
}

proptest! {
    #[test]
    fn started_machines_satisfy_the_activation_invariant(shape in shape_strategy()) {
        let (mut machine, ids) = machine_from(&shape);
        machine.start().unwrap();

        prop_assert!(machine.is_running());
        prop_assert!(!machine.active_leaves().is_empty());
        assert_activation_invariant(&machine, &ids);
    }

    #[test]
    fn stop_clears_every_active_flag(shape in shape_strategy()) {
        let (mut machine, ids) = machine_from(&shape);
        machine.start().unwrap();
        machine.stop();

        prop_assert!(!machine.is_running());
        prop_assert!(machine.active_states().is_empty());
        for &id in &ids {
            prop_assert!(!machine.is_state_active(id));
        }
    }

    #[test]
    fn active_leaves_are_exactly_the_childless_active_states(shape in shape_strategy()) {
        let (mut machine, _) = machine_from(&shape);
        machine.start().unwrap();

        let tree = machine.tree();
        let leaves = machine.active_leaves();
        for &leaf in &leaves {
            prop_assert!(tree.is_active(leaf));
            prop_assert!(!tree.children(leaf).iter().any(|&c| tree.is_active(c)));
        }
        let recount = machine
            .active_states()
            .into_iter()
            .filter(|&s| !tree.children(s).iter().any(|&c| tree.is_active(c)))
            .count();
        prop_assert_eq!(leaves.len(), recount);
    }

    #[test]
    fn lca_is_the_deepest_common_ancestor(
        shape in shape_strategy(),
        pick_a in any::<prop::sample::Index>(),
        pick_b in any::<prop::sample::Index>(),
    ) {
        let (machine, ids) = machine_from(&shape);
        let tree = machine.tree();
        let a = ids[pick_a.index(ids.len())];
        let b = ids[pick_b.index(ids.len())];

        let lca = tree.lca(a, b);
        let covers = |x: StateId| x == lca || tree.is_ancestor(lca, x);
        prop_assert!(covers(a));
        prop_assert!(covers(b));

        // Symmetric, and no child of the LCA covers both nodes.
        prop_assert_eq!(tree.lca(b, a), lca);
        for &child in tree.children(lca) {
            let child_covers =
                |x: StateId| x == child || tree.is_ancestor(child, x);
            prop_assert!(!(child_covers(a) && child_covers(b)));
        }
    }

    #[test]
    fn path_from_root_matches_the_ancestor_chain(
        shape in shape_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let (machine, ids) = machine_from(&shape);
        let tree = machine.tree();
        let node = ids[pick.index(ids.len())];

        let path = tree.path_from(tree.root(), node);
        let mut chain: Vec<StateId> = tree.ancestors(node).collect();
        chain.reverse();
        chain.push(node);
        // The ancestor chain ends at the root; the path starts below it.
        prop_assert_eq!(path, &chain[1..]);
    }

    #[test]
    fn restart_reproduces_the_same_initial_configuration(shape in shape_strategy()) {
        let (mut machine, _) = machine_from(&shape);
        machine.start().unwrap();
        let first = machine.active_states();

        machine.stop();
        machine.start().unwrap();
        prop_assert_eq!(machine.active_states(), first);
    }

    #[test]
    fn subkind_relation_matches_segment_prefixes(
        parent in prop::collection::vec("[a-z]{1,4}", 1..4),
        extra in prop::collection::vec("[a-z]{1,4}", 1..3),
    ) {
        let parent_kind = segments_to_kind(&parent);
        let mut child = parent.clone();
        child.extend(extra.iter().cloned());
        let child_kind = segments_to_kind(&child);

        prop_assert!(child_kind.is_subkind_of(&parent_kind));
        prop_assert!(child_kind.is_within(&parent_kind));
        prop_assert!(!parent_kind.is_subkind_of(&child_kind));
        prop_assert!(parent_kind.is_within(&parent_kind));
        prop_assert!(!parent_kind.is_subkind_of(&parent_kind));
    }

    #[test]
    fn sibling_kinds_are_unrelated(
        base in prop::collection::vec("[a-z]{1,4}", 1..3),
        left in "[a-z]{1,4}",
        right in "[a-z]{1,4}",
    ) {
        prop_assume!(left != right);
        let mut a = base.clone();
        a.push(left);
        let mut b = base;
        b.push(right);
        let a = segments_to_kind(&a);
        let b = segments_to_kind(&b);

        prop_assert!(!a.is_within(&b));
        prop_assert!(!b.is_within(&a));
    }
}
