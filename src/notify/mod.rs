//! Notification bus.
//!
//! An insertion-ordered set of [`MachineListener`]s observes state entry
//! and exit, transition firings, and machine lifecycle. Dispatch order per
//! firing: exits (leaf to ancestor), then the machine-level transition
//! notification, then entries (ancestor to leaf).

mod listener;

pub use listener::{
    EntryCtx, EventSink, ExitCtx, LifecycleCtx, ListenerId, MachineListener, StateRef,
    TransitionCtx,
};

pub(crate) use listener::ListenerSet;
