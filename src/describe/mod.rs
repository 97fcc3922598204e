//! Read-only description of a machine's frozen structure.
//!
//! This is the boundary surface a diagram exporter consumes: node names,
//! hierarchy, and transition event kinds, never the runtime state.
//! Transitions whose target is computed dynamically (or whose matcher is a
//! custom callback) are flagged unexported, since export cannot evaluate
//! arbitrary resolver callbacks.

use crate::core::{ChildMode, EventKind, NodeKind};
use crate::engine::StateMachine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable snapshot of a machine's structure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineDescription {
    pub name: String,
    pub instance_id: Uuid,
    pub states: Vec<StateDescription>,
    pub transitions: Vec<TransitionDescription>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateDescription {
    pub id: usize,
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub mode: ChildMode,
    pub kind: NodeKind,
    pub initial: Option<usize>,
    pub children: Vec<usize>,

    /// Type name of the declared data kind, for data-carrying states.
    pub data_kind: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionDescription {
    pub source: usize,

    /// Declared event kind; absent for custom matchers.
    pub event_kind: Option<EventKind>,

    /// Fixed target; absent for `stay` and dynamic directions.
    pub target: Option<usize>,

    pub data_kind: Option<String>,

    /// False when the target or matcher is an opaque callback the
    /// exporter cannot evaluate.
    pub exported: bool,
}

impl MachineDescription {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl StateMachine {
    /// Describe the frozen tree and transition table.
    pub fn describe(&self) -> MachineDescription {
        let tree = self.tree();
        let states = tree
            .ids()
            .map(|id| StateDescription {
                id: id.index(),
                name: tree.name(id).map(str::to_owned),
                parent: tree.parent(id).map(|p| p.index()),
                mode: tree.mode(id),
                kind: tree.kind(id),
                initial: tree.initial(id).map(|i| i.index()),
                children: tree.children(id).iter().map(|c| c.index()).collect(),
                data_kind: tree.data_kind(id).map(|k| k.type_name().to_owned()),
            })
            .collect();

        let transitions = self
            .transitions()
            .iter()
            .map(|t| {
                let event_kind = t.declared_kind().cloned();
                let dynamic = t.direction.is_dynamic();
                TransitionDescription {
                    source: t.source().index(),
                    target: t.direction.fixed_target().map(|s| s.index()),
                    data_kind: t.data_kind().map(|k| k.type_name().to_owned()),
                    exported: event_kind.is_some() && !dynamic,
                    event_kind,
                }
            })
            .collect();

        MachineDescription {
            name: self.name().to_owned(),
            instance_id: self.instance_id(),
            states,
            transitions,
        }
    }
}
