//! Builder for assembling state machines.
//!
//! The builder is the only structural mutator in the crate: `build()`
//! consumes it and hands the frozen tree to the engine, so structural
//! changes after `start()` are impossible by construction.

use crate::builder::error::ConfigError;
use crate::builder::transition::TransitionBuilder;
use crate::core::{
    ChildMode, DataKind, MatchPolicy, NodeKind, StateId, StateTree, Transition,
};
use crate::engine::{IgnoredEventPolicy, Logger, PendingEventPolicy, StateMachine};
use std::any::Any;

/// Assembles a state tree plus transitions into a [`StateMachine`].
pub struct MachineBuilder {
    tree: StateTree,
    transitions: Vec<TransitionBuilder>,
    default_match: MatchPolicy,
    ignored: IgnoredEventPolicy,
    pending: PendingEventPolicy,
    logger: Logger,
}

impl MachineBuilder {
    /// Start a machine definition; `name` becomes the root state's name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            tree: StateTree::new(name),
            transitions: Vec::new(),
            default_match: MatchPolicy::default(),
            ignored: IgnoredEventPolicy::default(),
            pending: PendingEventPolicy::default(),
            logger: Logger::default(),
        }
    }

    /// The root state id, parent for top-level states.
    pub fn root(&self) -> StateId {
        self.tree.root()
    }

    // -- states ------------------------------------------------------------

    /// Add a sequential composite (or leaf) state under `parent`.
    pub fn add_state(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
    ) -> Result<StateId, ConfigError> {
        self.add_node(parent, Some(name.into()), ChildMode::Sequential, NodeKind::Plain)
    }

    /// Add a state without a human-readable name.
    pub fn add_unnamed_state(&mut self, parent: StateId) -> Result<StateId, ConfigError> {
        self.add_node(parent, None, ChildMode::Sequential, NodeKind::Plain)
    }

    /// Add a parallel state: all of its children activate together, one
    /// region each.
    pub fn add_parallel_state(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
    ) -> Result<StateId, ConfigError> {
        self.add_node(parent, Some(name.into()), ChildMode::Parallel, NodeKind::Plain)
    }

    /// Add a final state. A final state directly under the root finishes
    /// the machine when entered.
    pub fn add_final_state(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
    ) -> Result<StateId, ConfigError> {
        self.add_node(parent, Some(name.into()), ChildMode::Sequential, NodeKind::Final)
    }

    /// Add a data-carrying state holding a `T` while active. Transitions
    /// targeting it must declare the same kind with
    /// [`TransitionBuilder::carries`].
    pub fn add_data_state<T: Any + Send + Sync>(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
    ) -> Result<StateId, ConfigError> {
        let id = self.add_node(parent, Some(name.into()), ChildMode::Sequential, NodeKind::Plain)?;
        self.tree.set_data_kind(id, DataKind::of::<T>());
        Ok(id)
    }

    fn add_node(
        &mut self,
        parent: StateId,
        name: Option<String>,
        mode: ChildMode,
        kind: NodeKind,
    ) -> Result<StateId, ConfigError> {
        self.check_known(parent)?;
        if self.tree.is_final(parent) {
            return Err(ConfigError::ChildOfFinal {
                state: self.tree.display_name(parent),
            });
        }
        Ok(self.tree.add_child(parent, name, mode, kind))
    }

    /// Designate the initial child of a sequential composite.
    pub fn set_initial(&mut self, parent: StateId, child: StateId) -> Result<(), ConfigError> {
        self.check_known(parent)?;
        self.check_known(child)?;
        if self.tree.mode(parent) == ChildMode::Parallel {
            return Err(ConfigError::InitialOnParallel {
                state: self.tree.display_name(parent),
            });
        }
        if self.tree.parent(child) != Some(parent) {
            return Err(ConfigError::InitialNotChild {
                state: self.tree.display_name(parent),
                child: self.tree.display_name(child),
            });
        }
        self.tree.set_initial(parent, child);
        Ok(())
    }

    // -- transitions -------------------------------------------------------

    /// Register a transition. The source is validated immediately; matcher
    /// and data-kind consistency complete at `build()`.
    pub fn transition(&mut self, builder: TransitionBuilder) -> Result<&mut Self, ConfigError> {
        if let Some(source) = builder.source() {
            self.check_known(source)?;
            if self.tree.is_final(source) {
                return Err(ConfigError::SourceIsFinal {
                    state: self.tree.display_name(source),
                });
            }
        }
        self.transitions.push(builder);
        Ok(self)
    }

    // -- configuration knobs -----------------------------------------------

    /// Default matching policy for transitions declared with `.on(kind)`.
    pub fn with_match_policy(&mut self, policy: MatchPolicy) -> &mut Self {
        self.default_match = policy;
        self
    }

    /// Policy invoked when no transition matches an event.
    pub fn with_ignored_events(&mut self, policy: IgnoredEventPolicy) -> &mut Self {
        self.ignored = policy;
        self
    }

    /// Policy invoked on reentrant `process_event`.
    pub fn with_pending_events(&mut self, policy: PendingEventPolicy) -> &mut Self {
        self.pending = policy;
        self
    }

    /// Log sink for the engine's descriptive output.
    pub fn with_logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    // -- build -------------------------------------------------------------

    /// Validate the definition and freeze it into a machine.
    pub fn build(self) -> Result<StateMachine, ConfigError> {
        let Self {
            tree,
            transitions,
            default_match,
            ignored,
            pending,
            logger,
        } = self;

        // Every sequential composite needs its designated initial child.
        for id in tree.ids() {
            if tree.mode(id) == ChildMode::Sequential
                && !tree.children(id).is_empty()
                && tree.initial(id).is_none()
            {
                return Err(ConfigError::MissingInitial {
                    state: tree.display_name(id),
                });
            }
        }

        let mut built = Vec::with_capacity(transitions.len());
        for builder in transitions {
            let transition = builder.build(default_match)?;
            validate_transition(&tree, &transition)?;
            built.push(transition);
        }

        Ok(StateMachine::assemble(tree, built, ignored, pending, logger))
    }

    fn check_known(&self, id: StateId) -> Result<(), ConfigError> {
        if self.tree.contains(id) {
            Ok(())
        } else {
            Err(ConfigError::UnknownState {
                state: id.to_string(),
            })
        }
    }
}

impl std::fmt::Debug for MachineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MachineBuilder({} states, {} transitions)",
            self.tree.len(),
            self.transitions.len()
        )
    }
}

fn validate_transition(tree: &StateTree, transition: &Transition) -> Result<(), ConfigError> {
    let source = transition.source();
    if !tree.contains(source) {
        return Err(ConfigError::UnknownState {
            state: source.to_string(),
        });
    }
    if tree.is_final(source) {
        return Err(ConfigError::SourceIsFinal {
            state: tree.display_name(source),
        });
    }

    // Data-kind consistency can only be checked for fixed targets; dynamic
    // resolvers fall back to the sequencer's runtime guard.
    let Some(target) = transition.direction.fixed_target() else {
        return Ok(());
    };
    if !tree.contains(target) {
        return Err(ConfigError::UnknownState {
            state: target.to_string(),
        });
    }
    match (tree.data_kind(target), transition.data_kind()) {
        (Some(expected), None) => Err(ConfigError::MissingDataKind {
            state: tree.display_name(target),
            expected: expected.type_name(),
        }),
        (Some(expected), Some(declared)) if declared != expected => {
            Err(ConfigError::DataKindMismatch {
                state: tree.display_name(target),
                declared: declared.type_name(),
                expected: expected.type_name(),
            })
        }
        (None, Some(declared)) => Err(ConfigError::TargetNotDataState {
            state: tree.display_name(target),
            declared: declared.type_name(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Event;

    #[test]
    fn build_requires_an_initial_for_composites() {
        let mut b = MachineBuilder::new("m");
        let _a = b.add_state(b.root(), "a").unwrap();
        let err = b.build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingInitial { .. }));
    }

    #[test]
    fn nested_composites_each_need_an_initial() {
        let mut b = MachineBuilder::new("m");
        let p = b.add_state(b.root(), "p").unwrap();
        let _c = b.add_state(p, "c").unwrap();
        b.set_initial(b.root(), p).unwrap();
        let err = b.build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingInitial { state } if state == "p"));
    }

    #[test]
    fn parallel_states_take_no_initial() {
        let mut b = MachineBuilder::new("m");
        let par = b.add_parallel_state(b.root(), "par").unwrap();
        let r1 = b.add_state(par, "r1").unwrap();
        let err = b.set_initial(par, r1).unwrap_err();
        assert!(matches!(err, ConfigError::InitialOnParallel { .. }));
    }

    #[test]
    fn initial_must_be_a_child() {
        let mut b = MachineBuilder::new("m");
        let a = b.add_state(b.root(), "a").unwrap();
        let x = b.add_state(a, "x").unwrap();
        let err = b.set_initial(b.root(), x).unwrap_err();
        assert!(matches!(err, ConfigError::InitialNotChild { .. }));
    }

    #[test]
    fn final_states_are_leaves() {
        let mut b = MachineBuilder::new("m");
        let done = b.add_final_state(b.root(), "done").unwrap();
        let err = b.add_state(done, "oops").unwrap_err();
        assert!(matches!(err, ConfigError::ChildOfFinal { .. }));
    }

    #[test]
    fn transitions_cannot_leave_a_final_state() {
        let mut b = MachineBuilder::new("m");
        let a = b.add_state(b.root(), "a").unwrap();
        let done = b.add_final_state(b.root(), "done").unwrap();
        b.set_initial(b.root(), a).unwrap();
        let err = b
            .transition(TransitionBuilder::new().from(done).on("X").to(a))
            .unwrap_err();
        assert!(matches!(err, ConfigError::SourceIsFinal { .. }));
    }

    #[test]
    fn data_target_requires_a_declared_kind() {
        let mut b = MachineBuilder::new("m");
        let a = b.add_state(b.root(), "a").unwrap();
        let form = b.add_data_state::<String>(b.root(), "form").unwrap();
        b.set_initial(b.root(), a).unwrap();
        b.transition(TransitionBuilder::new().from(a).on("Submit").to(form))
            .unwrap();
        let err = b.build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingDataKind { .. }));
    }

    #[test]
    fn data_kind_mismatch_is_rejected() {
        let mut b = MachineBuilder::new("m");
        let a = b.add_state(b.root(), "a").unwrap();
        let form = b.add_data_state::<String>(b.root(), "form").unwrap();
        b.set_initial(b.root(), a).unwrap();
        b.transition(
            TransitionBuilder::new()
                .from(a)
                .on("Submit")
                .to(form)
                .carries::<u32>(),
        )
        .unwrap();
        let err = b.build().unwrap_err();
        assert!(matches!(err, ConfigError::DataKindMismatch { .. }));
    }

    #[test]
    fn declared_kind_against_plain_target_is_rejected() {
        let mut b = MachineBuilder::new("m");
        let a = b.add_state(b.root(), "a").unwrap();
        let plain = b.add_state(b.root(), "plain").unwrap();
        b.set_initial(b.root(), a).unwrap();
        b.transition(
            TransitionBuilder::new()
                .from(a)
                .on("Submit")
                .to(plain)
                .carries::<u32>(),
        )
        .unwrap();
        let err = b.build().unwrap_err();
        assert!(matches!(err, ConfigError::TargetNotDataState { .. }));
    }

    #[test]
    fn built_machine_runs() {
        let mut b = MachineBuilder::new("m");
        let a = b.add_state(b.root(), "a").unwrap();
        let z = b.add_state(b.root(), "z").unwrap();
        b.set_initial(b.root(), a).unwrap();
        b.transition(TransitionBuilder::new().from(a).on("Go").to(z))
            .unwrap();

        let mut machine = b.build().unwrap();
        machine.start().unwrap();
        machine.process_event(Event::new("Go")).unwrap();
        assert_eq!(machine.active_leaves(), vec![z]);
    }

    #[test]
    fn unknown_parent_is_rejected_immediately() {
        let mut b = MachineBuilder::new("m");
        let err = b.add_state(StateId(42), "ghost").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownState { .. }));
    }
}
