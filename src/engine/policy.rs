//! Pluggable policies for exceptional processing conditions.

use crate::core::Event;
use crate::engine::log::Logger;

/// What to do when no transition matches the active leaf set.
///
/// Never fatal: an unmatched event leaves the machine untouched either way.
#[derive(Default)]
pub enum IgnoredEventPolicy {
    /// Silently discard (default).
    #[default]
    Silent,

    /// Emit a log line through the machine's logger.
    Log,

    /// Hand the event to an embedder callback.
    Custom(Box<dyn FnMut(&Event) + Send>),
}

impl IgnoredEventPolicy {
    pub(crate) fn report(&mut self, logger: &Logger, event: &Event) {
        match self {
            IgnoredEventPolicy::Silent => {}
            IgnoredEventPolicy::Log => {
                logger.log(|| format!("ignored event {}", event.kind()));
            }
            IgnoredEventPolicy::Custom(handler) => handler(event),
        }
    }
}

impl std::fmt::Debug for IgnoredEventPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoredEventPolicy::Silent => f.write_str("Silent"),
            IgnoredEventPolicy::Log => f.write_str("Log"),
            IgnoredEventPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What to do with an event submitted while another is being processed
/// (from a listener callback, or any other reentrant call).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PendingEventPolicy {
    /// Treat reentrant submission as a fatal usage error (default).
    #[default]
    Fail,

    /// Discard the pending event (logged).
    Drop,

    /// Queue the pending event; it is processed in submission order once
    /// the in-flight event completes.
    Defer,
}
