//! Listener trait and notification contexts.
//!
//! Every capability is independently optional: implement only the hooks
//! you care about, the rest default to no-ops. Listeners are dispatched in
//! insertion order.
//!
//! Callbacks run synchronously inside the processing pipeline. A callback
//! that wants to submit another event must go through the [`EventSink`] in
//! its context; the submission is routed to the machine's pending-event
//! policy instead of reentering the pipeline.

use crate::core::{ArgValue, Event, StateId};
use crate::engine::PendingEventPolicy;

/// Handle returned by `add_listener`, used for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Identity and display name of a state, as handed to listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateRef {
    pub id: StateId,
    pub name: Option<String>,
}

impl StateRef {
    /// Name if present, otherwise the id rendered as `#n`.
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }
}

/// Collects events submitted from inside listener callbacks and applies
/// the machine's pending-event policy to them.
pub struct EventSink {
    policy: PendingEventPolicy,
    pub(crate) deferred: Vec<(Event, Option<ArgValue>)>,
    pub(crate) dropped: usize,
    pub(crate) rejected: bool,
}

impl EventSink {
    pub(crate) fn new(policy: PendingEventPolicy) -> Self {
        Self {
            policy,
            deferred: Vec::new(),
            dropped: 0,
            rejected: false,
        }
    }

    /// Submit an event while another is in flight.
    pub fn submit(&mut self, event: Event) {
        self.submit_with(event, None);
    }

    /// Submit an event with a processing argument.
    pub fn submit_with(&mut self, event: Event, argument: Option<ArgValue>) {
        match self.policy {
            PendingEventPolicy::Fail => self.rejected = true,
            PendingEventPolicy::Drop => self.dropped += 1,
            PendingEventPolicy::Defer => self.deferred.push((event, argument)),
        }
    }
}

/// Context for machine-level lifecycle notifications.
pub struct LifecycleCtx<'a> {
    /// The machine's name (its root state name).
    pub machine: &'a str,
    pub sink: &'a mut EventSink,
}

/// Context for a state entry notification.
pub struct EntryCtx<'a> {
    pub state: StateRef,

    /// The triggering event; `None` for the implicit start entry.
    pub event: Option<&'a Event>,

    /// The embedder-supplied processing argument.
    pub argument: Option<&'a ArgValue>,

    /// Argument set by a listener during the firing notification of the
    /// transition that entered this state.
    pub transition_argument: Option<&'a ArgValue>,

    pub sink: &'a mut EventSink,
}

/// Context for a state exit notification.
pub struct ExitCtx<'a> {
    pub state: StateRef,
    pub event: Option<&'a Event>,
    pub argument: Option<&'a ArgValue>,
    pub sink: &'a mut EventSink,
}

/// Context for the machine-level firing notification.
pub struct TransitionCtx<'a> {
    pub source: StateRef,

    /// Resolved target; `None` for `stay` firings.
    pub target: Option<StateRef>,

    pub event: &'a Event,
    pub argument: Option<&'a ArgValue>,
    pub sink: &'a mut EventSink,
    pub(crate) transition_argument: &'a mut Option<ArgValue>,
}

impl TransitionCtx<'_> {
    /// Attach an argument to this firing; the entered target's entry
    /// notifications will observe it.
    pub fn set_transition_argument(&mut self, value: ArgValue) {
        *self.transition_argument = Some(value);
    }

    pub fn transition_argument(&self) -> Option<&ArgValue> {
        self.transition_argument.as_ref()
    }
}

/// Observer of machine activity. All hooks default to no-ops.
pub trait MachineListener: Send {
    fn on_started(&mut self, _ctx: &mut LifecycleCtx) {}

    fn on_stopped(&mut self, _ctx: &mut LifecycleCtx) {}

    fn on_finished(&mut self, _ctx: &mut LifecycleCtx) {}

    fn on_entry(&mut self, _ctx: &mut EntryCtx) {}

    fn on_exit(&mut self, _ctx: &mut ExitCtx) {}

    fn on_transition(&mut self, _ctx: &mut TransitionCtx) {}

    /// Synthetic snapshot of the active states, delivered once when the
    /// listener subscribes to a machine that is already running, so late
    /// subscribers observe current state without missing context.
    fn on_state_changed(&mut self, _active: &[StateRef]) {}
}

/// Insertion-ordered set of listeners.
#[derive(Default)]
pub struct ListenerSet {
    entries: Vec<(ListenerId, Box<dyn MachineListener>)>,
    next_id: u64,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, listener: Box<dyn MachineListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Hand the freshly added listener its synthetic snapshot.
    pub(crate) fn notify_subscribed(&mut self, id: ListenerId, active: &[StateRef]) {
        if let Some((_, listener)) = self.entries.iter_mut().find(|(entry_id, _)| *entry_id == id) {
            listener.on_state_changed(active);
        }
    }

    pub(crate) fn notify_started(&mut self, machine: &str, sink: &mut EventSink) {
        for (_, listener) in &mut self.entries {
            listener.on_started(&mut LifecycleCtx { machine, sink: &mut *sink });
        }
    }

    pub(crate) fn notify_stopped(&mut self, machine: &str, sink: &mut EventSink) {
        for (_, listener) in &mut self.entries {
            listener.on_stopped(&mut LifecycleCtx { machine, sink: &mut *sink });
        }
    }

    pub(crate) fn notify_finished(&mut self, machine: &str, sink: &mut EventSink) {
        for (_, listener) in &mut self.entries {
            listener.on_finished(&mut LifecycleCtx { machine, sink: &mut *sink });
        }
    }

    pub(crate) fn notify_exit(
        &mut self,
        state: &StateRef,
        event: Option<&Event>,
        argument: Option<&ArgValue>,
        sink: &mut EventSink,
    ) {
        for (_, listener) in &mut self.entries {
            listener.on_exit(&mut ExitCtx {
                state: state.clone(),
                event,
                argument,
                sink: &mut *sink,
            });
        }
    }

    pub(crate) fn notify_entry(
        &mut self,
        state: &StateRef,
        event: Option<&Event>,
        argument: Option<&ArgValue>,
        transition_argument: Option<&ArgValue>,
        sink: &mut EventSink,
    ) {
        for (_, listener) in &mut self.entries {
            listener.on_entry(&mut EntryCtx {
                state: state.clone(),
                event,
                argument,
                transition_argument,
                sink: &mut *sink,
            });
        }
    }

    /// Dispatch the firing notification; returns the transition argument
    /// listeners may have set for the entry phase.
    pub(crate) fn notify_transition(
        &mut self,
        source: &StateRef,
        target: Option<&StateRef>,
        event: &Event,
        argument: Option<&ArgValue>,
        sink: &mut EventSink,
    ) -> Option<ArgValue> {
        let mut transition_argument = None;
        for (_, listener) in &mut self.entries {
            listener.on_transition(&mut TransitionCtx {
                source: source.clone(),
                target: target.cloned(),
                event,
                argument,
                sink: &mut *sink,
                transition_argument: &mut transition_argument,
            });
        }
        transition_argument
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ListenerSet({} listeners)", self.entries.len())
    }
}
