//! Events, event kinds, and matching policies.
//!
//! Event kinds are dotted paths (`"Media.Play"` is a subkind of `"Media"`),
//! which gives transitions a kind *family* to subscribe to. Payloads ride
//! along as type-erased values with their concrete type captured, so the
//! sequencer can enforce data-kind compatibility at runtime.

use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Type-erased value passed around the engine: event payloads, processing
/// arguments, and transition arguments all use this shape.
pub type ArgValue = Arc<dyn Any + Send + Sync>;

/// Wrap a value as an [`ArgValue`].
pub fn arg<T: Any + Send + Sync>(value: T) -> ArgValue {
    Arc::new(value)
}

/// The concrete Rust type a payload or data slot is declared to carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataKind {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

impl DataKind {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Hierarchical event kind tag.
///
/// Kinds form a tree through dotted segments: `"Input.Key"` is a subkind of
/// `"Input"`. Matching against a kind family is the default transition
/// matching policy; see [`MatchPolicy`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKind(Cow<'static, str>);

impl EventKind {
    /// Const constructor for `'static` kind names, usable in `const` items
    /// (see the `event_kinds!` macro).
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `self` is strictly below `other` in the kind tree.
    ///
    /// `"Input.Key"` is a subkind of `"Input"`, but `"Inputs"` is not.
    pub fn is_subkind_of(&self, other: &EventKind) -> bool {
        self.0.len() > other.0.len()
            && self.0.starts_with(&*other.0)
            && self.0.as_bytes()[other.0.len()] == b'.'
    }

    /// True if `self` equals `other` or is one of its subkinds.
    pub fn is_within(&self, other: &EventKind) -> bool {
        self == other || self.is_subkind_of(other)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// A kind-tagged value submitted to the machine.
///
/// Data-carrying events attach a payload; the engine binds it into the data
/// slot of a compatible data-carrying target state.
#[derive(Clone)]
pub struct Event {
    kind: EventKind,
    payload: Option<ArgValue>,
    payload_kind: Option<DataKind>,
}

impl Event {
    pub fn new(kind: impl Into<EventKind>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            payload_kind: None,
        }
    }

    /// An event carrying a typed payload.
    pub fn with_payload<T: Any + Send + Sync>(kind: impl Into<EventKind>, payload: T) -> Self {
        Self {
            kind: kind.into(),
            payload: Some(Arc::new(payload)),
            payload_kind: Some(DataKind::of::<T>()),
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// The payload downcast to `T`, if present and of that type.
    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }

    pub(crate) fn payload_value(&self) -> Option<&ArgValue> {
        self.payload.as_ref()
    }

    pub(crate) fn payload_kind(&self) -> Option<&DataKind> {
        self.payload_kind.as_ref()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Event");
        s.field("kind", &self.kind.as_str());
        if let Some(kind) = &self.payload_kind {
            s.field("payload", &kind.type_name());
        }
        s.finish()
    }
}

/// Decides whether an incoming event is compatible with a transition's
/// declared event kind.
///
/// The two built-in policies cover the usual cases; embedders may supply
/// custom matchers per transition.
pub trait EventMatcher: Send + Sync {
    fn matches(&self, event: &Event) -> bool;

    /// Declared kind, when the matcher has one. Used by logging and the
    /// description surface; custom matchers may return `None`.
    fn declared_kind(&self) -> Option<&EventKind> {
        None
    }
}

/// Matches the declared kind and any of its subkinds (default policy).
pub struct KindOrSubkind(pub EventKind);

impl EventMatcher for KindOrSubkind {
    fn matches(&self, event: &Event) -> bool {
        event.kind().is_within(&self.0)
    }

    fn declared_kind(&self) -> Option<&EventKind> {
        Some(&self.0)
    }
}

/// Matches only the exact declared kind.
pub struct ExactKind(pub EventKind);

impl EventMatcher for ExactKind {
    fn matches(&self, event: &Event) -> bool {
        event.kind() == &self.0
    }

    fn declared_kind(&self) -> Option<&EventKind> {
        Some(&self.0)
    }
}

/// Machine-wide default applied when a transition declares a kind without
/// an explicit matcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPolicy {
    #[default]
    KindOrSubkind,
    Exact,
}

impl MatchPolicy {
    pub(crate) fn matcher_for(self, kind: EventKind) -> Box<dyn EventMatcher> {
        match self {
            MatchPolicy::KindOrSubkind => Box::new(KindOrSubkind(kind)),
            MatchPolicy::Exact => Box::new(ExactKind(kind)),
        }
    }
}
