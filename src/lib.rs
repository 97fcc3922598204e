//! Statree: a hierarchical and parallel state machine execution engine.
//!
//! Statree executes statecharts: a declaratively built tree of states with
//! transitions between them. Events are processed one at a time; the
//! engine resolves the most specific matching transition, computes the
//! ordered exit and entry sequences through the least common ancestor of
//! source and target, fans out across parallel regions, binds typed
//! payloads into data-carrying states, and notifies listeners along the
//! way.
//!
//! # Core Concepts
//!
//! - **State tree**: states form a hierarchy; composite states descend
//!   into a designated initial child, parallel states activate all of
//!   their children at once
//! - **Transitions**: matched by event kind family, filtered by guard
//!   predicates, directed by fixed targets or lazily evaluated resolvers
//! - **Listeners**: observe entry/exit, firings, and machine lifecycle in
//!   insertion order
//!
//! # Example
//!
//! ```rust
//! use statree::builder::transition_to;
//! use statree::{Event, MachineBuilder};
//!
//! let mut b = MachineBuilder::new("traffic");
//! let green = b.add_state(b.root(), "Green").unwrap();
//! let yellow = b.add_state(b.root(), "Yellow").unwrap();
//! let red = b.add_final_state(b.root(), "Red").unwrap();
//! b.set_initial(b.root(), green).unwrap();
//! b.transition(transition_to(green, "Advance", yellow)).unwrap();
//! b.transition(transition_to(yellow, "Advance", red)).unwrap();
//!
//! let mut machine = b.build().unwrap();
//! machine.start().unwrap();
//!
//! machine.process_event(Event::new("Advance")).unwrap();
//! assert_eq!(machine.active_leaves(), vec![yellow]);
//!
//! machine.process_event(Event::new("Advance")).unwrap();
//! assert!(machine.is_finished());
//! ```
//!
//! # Threading
//!
//! The engine is single-threaded by contract: every callback runs
//! synchronously inside `process_event`, and reentrant submissions are
//! routed to a configurable pending-event policy. Guard a machine with a
//! lock if multiple threads can reach it.

pub mod builder;
pub mod core;
pub mod describe;
pub mod engine;
pub mod notify;

// Re-export the everyday surface.
pub use crate::builder::{ConfigError, MachineBuilder, TransitionBuilder};
pub use crate::core::{
    arg, ArgValue, ChildMode, DataKind, Direction, Event, EventKind, EventMatcher, Guard,
    MatchPolicy, StateId, TransitionJournal, TransitionRecord,
};
pub use crate::describe::MachineDescription;
pub use crate::engine::{
    DataBindingError, EventOutcome, IgnoredEventPolicy, Logger, MachineError, PendingEventPolicy,
    StateMachine, UsageError,
};
pub use crate::notify::{ListenerId, MachineListener, StateRef};
