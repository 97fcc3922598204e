//! Core state machine model.
//!
//! This module contains the pure model the engine executes:
//! - the arena state tree ([`StateTree`], [`StateId`])
//! - events, kinds, and matching policies
//! - transitions with guards and direction resolvers
//! - the immutable transition journal
//!
//! Nothing in here dispatches notifications or mutates machine lifecycle;
//! that is the engine's job.

mod event;
mod journal;
mod node;
mod transition;

pub use event::{
    arg, ArgValue, DataKind, Event, EventKind, EventMatcher, ExactKind, KindOrSubkind, MatchPolicy,
};
pub use journal::{TransitionJournal, TransitionRecord};
pub use node::{Ancestors, ChildMode, NodeKind, StateId, StateTree};
pub use transition::{Direction, DirectionResolver, Guard, Transition};

pub(crate) use transition::TransitionId;
