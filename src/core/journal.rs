//! In-memory journal of applied firings.
//!
//! The journal makes a machine's recent behavior inspectable without
//! attaching a listener. It is an immutable value: `record` returns a new
//! journal with the entry appended. Nothing here is persisted; the journal
//! is cleared on every `start()`.

use crate::core::event::EventKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One applied firing (or the implicit start entry).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Display name of the source state; `None` for the implicit start
    /// entry.
    pub source: Option<String>,

    /// Display name of the resolved target; `None` for `stay` firings.
    pub target: Option<String>,

    /// Kind of the triggering event; `None` for the implicit start entry.
    pub event: Option<EventKind>,

    /// When the firing was applied.
    pub timestamp: DateTime<Utc>,
}

/// Ordered journal of firings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionJournal {
    records: Vec<TransitionRecord>,
}

impl TransitionJournal {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record, returning a new journal. The original is
    /// unchanged.
    pub fn record(&self, record: TransitionRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Elapsed time between the first and last record, if any.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.first()?, self.records.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }
}
