//! The event processing core.
//!
//! A [`StateMachine`] owns the frozen state tree and transition table and
//! drives the resolve/apply pipeline one event at a time. Reentrant
//! submissions are excluded by a single-flight flag and routed to the
//! pending-event policy; the flag is cleared unconditionally when a call
//! completes, so a failed transition never wedges the machine.

use crate::core::{
    ArgValue, Direction, Event, StateId, StateTree, Transition, TransitionId, TransitionJournal,
    TransitionRecord,
};
use crate::engine::error::{MachineError, UsageError};
use crate::engine::log::Logger;
use crate::engine::policy::{IgnoredEventPolicy, PendingEventPolicy};
use crate::engine::resolver;
use crate::engine::sequencer::Sequencer;
use crate::notify::{EventSink, ListenerId, MachineListener, StateRef};
use crate::notify::ListenerSet;
use chrono::Utc;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Lifecycle phase of the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Running,
    Finished,
}

/// What became of a submitted event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// At least one transition fired.
    Processed,

    /// No transition matched; the ignored-event policy was invoked.
    Ignored,

    /// The event was routed to the pending-event policy (deferred or
    /// dropped) instead of being processed now.
    Pending,
}

/// A hierarchical state machine, assembled by `MachineBuilder`.
pub struct StateMachine {
    instance_id: Uuid,
    tree: StateTree,
    transitions: Vec<Transition>,
    by_source: HashMap<StateId, Vec<TransitionId>>,
    listeners: ListenerSet,
    phase: Phase,
    processing: bool,
    pending: VecDeque<(Event, Option<ArgValue>)>,
    ignored_policy: IgnoredEventPolicy,
    pending_policy: PendingEventPolicy,
    journal: TransitionJournal,
    logger: Logger,
}

impl StateMachine {
    pub(crate) fn assemble(
        tree: StateTree,
        transitions: Vec<Transition>,
        ignored_policy: IgnoredEventPolicy,
        pending_policy: PendingEventPolicy,
        logger: Logger,
    ) -> Self {
        let mut by_source: HashMap<StateId, Vec<TransitionId>> = HashMap::new();
        for (id, transition) in transitions.iter().enumerate() {
            by_source.entry(transition.source()).or_default().push(id);
        }
        Self {
            instance_id: Uuid::new_v4(),
            tree,
            transitions,
            by_source,
            listeners: ListenerSet::new(),
            phase: Phase::NotStarted,
            processing: false,
            pending: VecDeque::new(),
            ignored_policy,
            pending_policy,
            journal: TransitionJournal::new(),
            logger,
        }
    }

    // -- inspection --------------------------------------------------------

    /// Unique identity of this machine instance.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// The machine's name (its root state name).
    pub fn name(&self) -> &str {
        self.tree.name(self.tree.root()).unwrap_or("machine")
    }

    /// Read-only view of the frozen state tree.
    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    pub(crate) fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn journal(&self) -> &TransitionJournal {
        &self.journal
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn active_states(&self) -> Vec<StateId> {
        self.tree.active_states()
    }

    pub fn active_leaves(&self) -> Vec<StateId> {
        self.tree.active_leaves()
    }

    pub fn is_state_active(&self, state: StateId) -> bool {
        self.tree.contains(state) && self.tree.is_active(state)
    }

    /// The payload currently bound to a data-carrying state, if that state
    /// is active and holds a value of type `T`.
    pub fn active_data<T: Any + Send + Sync>(&self, state: StateId) -> Option<&T> {
        if !self.tree.contains(state) {
            return None;
        }
        self.tree.data(state)?.downcast_ref::<T>()
    }

    // -- listeners ---------------------------------------------------------

    /// Register a listener. If the machine is already running (or
    /// finished), the listener immediately receives a synthetic
    /// state-changed notification with the currently active states.
    pub fn add_listener(&mut self, listener: Box<dyn MachineListener>) -> ListenerId {
        let id = self.listeners.add(listener);
        if self.phase != Phase::NotStarted {
            let active = self.state_refs(&self.tree.active_states());
            self.listeners.notify_subscribed(id, &active);
        }
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> Result<(), MachineError> {
        if self.listeners.remove(id) {
            Ok(())
        } else {
            Err(UsageError::UnknownListener(id).into())
        }
    }

    // -- lifecycle ---------------------------------------------------------

    /// Start the machine: enter the root's designated initial chain and
    /// notify listeners. Fails if the machine is already running.
    pub fn start(&mut self) -> Result<(), MachineError> {
        self.start_inner(None)
    }

    /// Test-harness entry point: start with the active state seeded to
    /// `state` (default descent continues below it). Entry notifications
    /// run exactly as for a normal start.
    pub fn start_from(&mut self, state: StateId) -> Result<(), MachineError> {
        if !self.tree.contains(state) {
            return Err(UsageError::UnknownState {
                state: state.to_string(),
            }
            .into());
        }
        self.start_inner(Some(state))
    }

    fn start_inner(&mut self, seed: Option<StateId>) -> Result<(), MachineError> {
        if self.phase == Phase::Running {
            return Err(UsageError::AlreadyStarted.into());
        }

        self.tree.deactivate_all();
        self.journal = TransitionJournal::new();
        self.pending.clear();
        self.processing = false;
        self.phase = Phase::Running;

        let name = self.name().to_owned();
        let instance = self.instance_id;
        self.logger
            .log(|| format!("machine '{name}' ({instance}) started"));

        let mut sink = EventSink::new(self.pending_policy);
        self.listeners.notify_started(&name, &mut sink);

        let entered = {
            let mut seq = Sequencer {
                tree: &mut self.tree,
                listeners: &mut self.listeners,
                logger: &self.logger,
                sink: &mut sink,
            };
            seq.apply_start(seed)
        };

        if entered.is_ok() {
            let leaves = self.tree.active_leaves();
            let target = leaves
                .iter()
                .map(|&leaf| self.tree.display_name(leaf))
                .collect::<Vec<_>>()
                .join("+");
            self.journal = self.journal.record(TransitionRecord {
                source: None,
                target: Some(target),
                event: None,
                timestamp: Utc::now(),
            });
            self.check_finished(&mut sink);
        }

        let sink_result = self.absorb_sink(sink);
        entered?;
        sink_result?;
        self.drain_pending()
    }

    /// Stop a running (or finished) machine: active flags and data slots
    /// are cleared, listeners get the machine-level stopped notification.
    /// No-op when the machine has not been started.
    pub fn stop(&mut self) {
        if self.phase == Phase::NotStarted {
            return;
        }
        self.phase = Phase::NotStarted;
        self.processing = false;
        self.pending.clear();
        self.tree.deactivate_all();

        let name = self.name().to_owned();
        self.logger.log(|| format!("machine '{name}' stopped"));

        let mut sink = EventSink::new(self.pending_policy);
        self.listeners.notify_stopped(&name, &mut sink);
        let discarded = sink.deferred.len() + sink.dropped + usize::from(sink.rejected);
        if discarded > 0 {
            self.logger
                .log(|| format!("discarded {discarded} event(s) submitted during stop"));
        }
    }

    // -- event processing --------------------------------------------------

    pub fn process_event(&mut self, event: Event) -> Result<EventOutcome, MachineError> {
        self.process_event_with(event, None)
    }

    /// Process one event with an embedder-supplied untyped argument.
    ///
    /// Exactly one event is in flight at a time: a reentrant call is
    /// routed to the pending-event policy instead of executing.
    pub fn process_event_with(
        &mut self,
        event: Event,
        argument: Option<ArgValue>,
    ) -> Result<EventOutcome, MachineError> {
        match self.phase {
            Phase::NotStarted => return Err(UsageError::NotStarted.into()),
            Phase::Finished => {
                self.ignored_policy.report(&self.logger, &event);
                return Ok(EventOutcome::Ignored);
            }
            Phase::Running => {}
        }

        if self.processing {
            return match self.pending_policy {
                PendingEventPolicy::Fail => Err(UsageError::ReentrantProcessEvent.into()),
                PendingEventPolicy::Drop => {
                    self.logger
                        .log(|| format!("dropped reentrant event {}", event.kind()));
                    Ok(EventOutcome::Pending)
                }
                PendingEventPolicy::Defer => {
                    self.pending.push_back((event, argument));
                    Ok(EventOutcome::Pending)
                }
            };
        }

        self.processing = true;
        let result = self.dispatch(&event, argument.as_ref());
        // Cleared unconditionally, also on failure.
        self.processing = false;

        let outcome = result?;
        self.drain_pending()?;
        Ok(outcome)
    }

    /// Process events deferred by the pending-event policy, in submission
    /// order, once the in-flight event has completed.
    fn drain_pending(&mut self) -> Result<(), MachineError> {
        while let Some((event, argument)) = self.pending.pop_front() {
            match self.phase {
                Phase::Running => {
                    self.processing = true;
                    let result = self.dispatch(&event, argument.as_ref());
                    self.processing = false;
                    result?;
                }
                Phase::Finished => self.ignored_policy.report(&self.logger, &event),
                Phase::NotStarted => {}
            }
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        event: &Event,
        argument: Option<&ArgValue>,
    ) -> Result<EventOutcome, MachineError> {
        let firings = resolver::resolve_firings(
            &self.tree,
            &self.transitions,
            &self.by_source,
            event,
            argument,
        );

        if firings.is_empty() {
            self.ignored_policy.report(&self.logger, event);
            return Ok(EventOutcome::Ignored);
        }

        let mut sink = EventSink::new(self.pending_policy);
        let mut failure: Option<MachineError> = None;

        for firing in firings {
            if self.phase != Phase::Running {
                break;
            }
            // A previous firing of this event may have exited this region.
            if !self.tree.is_active(firing.leaf) {
                continue;
            }

            match firing.direction {
                Direction::Stay => {
                    let transition = &self.transitions[firing.transition];
                    {
                        let mut seq = Sequencer {
                            tree: &mut self.tree,
                            listeners: &mut self.listeners,
                            logger: &self.logger,
                            sink: &mut sink,
                        };
                        seq.apply_stay(transition, event, argument);
                    }
                    self.journal = self.journal.record(TransitionRecord {
                        source: Some(self.tree.display_name(transition.source())),
                        target: None,
                        event: Some(event.kind().clone()),
                        timestamp: Utc::now(),
                    });
                }
                Direction::To(target) => {
                    if !self.tree.contains(target) {
                        failure = Some(
                            UsageError::UnknownState {
                                state: target.to_string(),
                            }
                            .into(),
                        );
                        break;
                    }
                    let transition = &self.transitions[firing.transition];
                    let applied = {
                        let mut seq = Sequencer {
                            tree: &mut self.tree,
                            listeners: &mut self.listeners,
                            logger: &self.logger,
                            sink: &mut sink,
                        };
                        seq.apply_transition(transition, target, event, argument)
                    };
                    match applied {
                        Ok(()) => {
                            self.journal = self.journal.record(TransitionRecord {
                                source: Some(self.tree.display_name(transition.source())),
                                target: Some(self.tree.display_name(target)),
                                event: Some(event.kind().clone()),
                                timestamp: Utc::now(),
                            });
                            self.check_finished(&mut sink);
                        }
                        Err(err) => {
                            failure = Some(err.into());
                            break;
                        }
                    }
                }
                Direction::NoTransition => {}
            }
        }

        let sink_result = self.absorb_sink(sink);
        if let Some(err) = failure {
            return Err(err);
        }
        sink_result?;
        Ok(EventOutcome::Processed)
    }

    /// Mark the machine finished once a top-level final state is active.
    fn check_finished(&mut self, sink: &mut EventSink) {
        if self.phase != Phase::Running {
            return;
        }
        let root = self.tree.root();
        let finished = self
            .tree
            .active_leaves()
            .into_iter()
            .any(|leaf| self.tree.is_final(leaf) && self.tree.parent(leaf) == Some(root));
        if finished {
            self.phase = Phase::Finished;
            let name = self.name().to_owned();
            self.logger.log(|| format!("machine '{name}' finished"));
            self.listeners.notify_finished(&name, sink);
        }
    }

    /// Fold listener-submitted events back into the machine.
    fn absorb_sink(&mut self, sink: EventSink) -> Result<(), MachineError> {
        if sink.dropped > 0 {
            self.logger.log(|| {
                format!(
                    "dropped {} event(s) submitted during processing",
                    sink.dropped
                )
            });
        }
        self.pending.extend(sink.deferred);
        if sink.rejected {
            return Err(UsageError::ReentrantProcessEvent.into());
        }
        Ok(())
    }

    fn state_refs(&self, ids: &[StateId]) -> Vec<StateRef> {
        ids.iter()
            .map(|&id| StateRef {
                id,
                name: self.tree.name(id).map(str::to_owned),
            })
            .collect()
    }
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.name())
            .field("instance_id", &self.instance_id)
            .field("states", &self.tree.len())
            .field("transitions", &self.transitions.len())
            .field("listeners", &self.listeners.len())
            .field("running", &self.is_running())
            .field("finished", &self.is_finished())
            .finish()
    }
}
