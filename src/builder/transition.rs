//! Fluent builder for transitions.

use crate::builder::error::ConfigError;
use crate::core::{
    ArgValue, DataKind, Direction, DirectionResolver, Event, EventKind, EventMatcher, Guard,
    MatchPolicy, StateId, Transition,
};
use std::any::Any;

/// Builds one [`Transition`] with a fluent API.
///
/// ```
/// use statree::builder::TransitionBuilder;
/// use statree::MachineBuilder;
///
/// let mut b = MachineBuilder::new("doc");
/// let draft = b.add_state(b.root(), "Draft").unwrap();
/// let review = b.add_state(b.root(), "Review").unwrap();
/// b.set_initial(b.root(), draft).unwrap();
/// b.transition(
///     TransitionBuilder::new()
///         .from(draft)
///         .on("Submit")
///         .to(review),
/// )
/// .unwrap();
/// let machine = b.build().unwrap();
/// ```
pub struct TransitionBuilder {
    source: Option<StateId>,
    kind: Option<EventKind>,
    exact: bool,
    matcher: Option<Box<dyn EventMatcher>>,
    guard: Option<Guard>,
    direction: Option<DirectionResolver>,
    data_kind: Option<DataKind>,
    name: Option<String>,
}

impl TransitionBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            kind: None,
            exact: false,
            matcher: None,
            guard: None,
            direction: None,
            data_kind: None,
            name: None,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, state: StateId) -> Self {
        self.source = Some(state);
        self
    }

    /// Declare the event kind, matched under the machine's default policy
    /// (required unless a custom matcher is supplied).
    pub fn on(mut self, kind: impl Into<EventKind>) -> Self {
        self.kind = Some(kind.into());
        self.exact = false;
        self
    }

    /// Declare the event kind with exact matching, whatever the machine
    /// default is.
    pub fn on_exact(mut self, kind: impl Into<EventKind>) -> Self {
        self.kind = Some(kind.into());
        self.exact = true;
        self
    }

    /// Supply a custom event matcher instead of a declared kind.
    pub fn matcher(mut self, matcher: Box<dyn EventMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Add a guard from a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Event, Option<&ArgValue>) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Add a pre-built guard (optional).
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Fixed target state.
    pub fn to(mut self, state: StateId) -> Self {
        self.direction = Some(DirectionResolver::To(state));
        self
    }

    /// Fire without changing the active state set.
    pub fn stay(mut self) -> Self {
        self.direction = Some(DirectionResolver::Stay);
        self
    }

    /// Resolve the direction lazily from the event and argument.
    pub fn direction<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Event, Option<&ArgValue>) -> Direction + Send + Sync + 'static,
    {
        self.direction = Some(DirectionResolver::Dynamic(Box::new(resolver)));
        self
    }

    /// Declare the payload kind this transition feeds into its
    /// data-carrying target.
    pub fn carries<T: Any + Send + Sync>(mut self) -> Self {
        self.data_kind = Some(DataKind::of::<T>());
        self
    }

    /// Name the transition for logs and journal records (optional).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn source(&self) -> Option<StateId> {
        self.source
    }

    pub(crate) fn build(self, default_policy: MatchPolicy) -> Result<Transition, ConfigError> {
        let source = self.source.ok_or(ConfigError::MissingSource)?;
        let direction = self.direction.ok_or(ConfigError::MissingDirection)?;
        let matcher = match (self.matcher, self.kind) {
            (Some(matcher), _) => matcher,
            (None, Some(kind)) if self.exact => MatchPolicy::Exact.matcher_for(kind),
            (None, Some(kind)) => default_policy.matcher_for(kind),
            (None, None) => return Err(ConfigError::MissingMatcher),
        };

        Ok(Transition {
            source,
            matcher,
            guard: self.guard,
            direction,
            data_kind: self.data_kind,
            name: self.name,
        })
    }
}

impl Default for TransitionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
