//! Runtime error taxonomy.
//!
//! Build-time problems are `builder::ConfigError`; everything that can go
//! wrong on a started machine lands here. Usage and data-binding errors are
//! fatal and propagate out of the triggering call; ignored events are not
//! errors at all and go through the ignored-event policy.

use crate::notify::ListenerId;
use thiserror::Error;

/// API misuse, surfaced immediately.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("process_event called before start()")]
    NotStarted,

    #[error("start() called while the machine is already running")]
    AlreadyStarted,

    #[error("reentrant process_event rejected by the pending-event policy")]
    ReentrantProcessEvent,

    #[error("no listener registered under {0}")]
    UnknownListener(ListenerId),

    #[error("state {state} does not belong to this machine")]
    UnknownState { state: String },
}

/// A data-carrying state was entered without a compatible payload.
///
/// Raised during sequencing, before the failing node's entry notification;
/// exits already performed are not rolled back.
#[derive(Debug, Error)]
pub enum DataBindingError {
    /// The state was activated implicitly (initial chain, parallel
    /// fan-out, or cross-level pass-through) instead of as the resolved
    /// target of a transition declaring its data kind.
    #[error("data state '{state}' (expects {expected}) entered without a data-carrying transition")]
    ImplicitEntry {
        state: String,
        expected: &'static str,
    },

    #[error("data state '{state}' expects {expected} but the event carried no payload")]
    MissingPayload {
        state: String,
        expected: &'static str,
    },

    #[error("data state '{state}' expects {expected} but the event carried {got}")]
    PayloadMismatch {
        state: String,
        expected: &'static str,
        got: &'static str,
    },
}

/// Any fatal runtime failure of the engine.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    DataBinding(#[from] DataBindingError),
}
