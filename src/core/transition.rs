//! Transitions, guard predicates, and direction resolution.
//!
//! A transition never stores a bare target state: it stores a
//! [`DirectionResolver`] that yields the direction at evaluation time. Fixed
//! targets and `stay` are just the degenerate resolvers, which keeps the
//! resolution engine ignorant of how targets are computed.

use crate::core::event::{ArgValue, DataKind, Event, EventKind, EventMatcher};
use crate::core::node::StateId;

/// Predicate controlling whether a matched transition may fire.
///
/// Guards read the event and the embedder-supplied processing argument;
/// they are opaque to the engine and must not mutate machine state.
pub struct Guard {
    predicate: Box<dyn Fn(&Event, Option<&ArgValue>) -> bool + Send + Sync>,
}

impl Guard {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Event, Option<&ArgValue>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }

    pub fn check(&self, event: &Event, argument: Option<&ArgValue>) -> bool {
        (self.predicate)(event, argument)
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard(..)")
    }
}

/// Outcome of evaluating a transition's direction resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Move to the given state (any node in the tree; cross-level targets
    /// are permitted).
    To(StateId),

    /// Fire without changing the active state set.
    Stay,

    /// Treat the event as unmatched for this source.
    NoTransition,
}

/// Computes a transition's direction when it is about to fire.
pub enum DirectionResolver {
    /// Always `Direction::To(target)`.
    To(StateId),

    /// Always `Direction::Stay`.
    Stay,

    /// Lazily computed from the event and processing argument.
    Dynamic(Box<dyn Fn(&Event, Option<&ArgValue>) -> Direction + Send + Sync>),
}

impl DirectionResolver {
    pub fn resolve(&self, event: &Event, argument: Option<&ArgValue>) -> Direction {
        match self {
            DirectionResolver::To(target) => Direction::To(*target),
            DirectionResolver::Stay => Direction::Stay,
            DirectionResolver::Dynamic(f) => f(event, argument),
        }
    }

    /// The target when it is statically known. Dynamic resolvers return
    /// `None`; the description surface reports them as unexported.
    pub fn fixed_target(&self) -> Option<StateId> {
        match self {
            DirectionResolver::To(target) => Some(*target),
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, DirectionResolver::Dynamic(_))
    }
}

impl std::fmt::Debug for DirectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectionResolver::To(target) => write!(f, "To({target})"),
            DirectionResolver::Stay => f.write_str("Stay"),
            DirectionResolver::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Index of a transition in the machine's transition table.
pub(crate) type TransitionId = usize;

/// A registered transition: source state, event matcher, optional guard,
/// direction resolver, and (for data transitions) the declared payload kind.
pub struct Transition {
    pub(crate) source: StateId,
    pub(crate) matcher: Box<dyn EventMatcher>,
    pub(crate) guard: Option<Guard>,
    pub(crate) direction: DirectionResolver,
    pub(crate) data_kind: Option<DataKind>,
    pub(crate) name: Option<String>,
}

impl Transition {
    pub fn source(&self) -> StateId {
        self.source
    }

    /// Declared event kind, absent for fully custom matchers.
    pub fn declared_kind(&self) -> Option<&EventKind> {
        self.matcher.declared_kind()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data_kind(&self) -> Option<&DataKind> {
        self.data_kind.as_ref()
    }

    /// Matcher plus guard; direction is evaluated separately once a
    /// transition has been chosen.
    pub(crate) fn accepts(&self, event: &Event, argument: Option<&ArgValue>) -> bool {
        if !self.matcher.matches(event) {
            return false;
        }
        match &self.guard {
            Some(guard) => guard.check(event, argument),
            None => true,
        }
    }

    pub(crate) fn resolve(&self, event: &Event, argument: Option<&ArgValue>) -> Direction {
        self.direction.resolve(event, argument)
    }

    /// Label used in logs and journal records.
    pub(crate) fn label(&self) -> String {
        match (&self.name, self.declared_kind()) {
            (Some(name), _) => name.clone(),
            (None, Some(kind)) => format!("on {kind}"),
            (None, None) => "custom".to_owned(),
        }
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("kind", &self.declared_kind().map(EventKind::as_str))
            .field("direction", &self.direction)
            .finish()
    }
}
