//! Configuration errors, raised while assembling a machine.

use thiserror::Error;

/// Errors that make a machine definition unbuildable.
///
/// All of these surface from `MachineBuilder` before `start()` is ever
/// reachable; a machine that builds successfully has a structurally valid
/// tree.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("state {state} does not belong to this machine definition")]
    UnknownState { state: String },

    #[error("composite state '{state}' has no designated initial child")]
    MissingInitial { state: String },

    #[error("'{child}' is not a child of '{state}' and cannot be its initial")]
    InitialNotChild { state: String, child: String },

    #[error("parallel state '{state}' cannot designate an initial child; all children activate together")]
    InitialOnParallel { state: String },

    #[error("final state '{state}' cannot have children")]
    ChildOfFinal { state: String },

    #[error("final state '{state}' cannot be the source of a transition")]
    SourceIsFinal { state: String },

    #[error("transition to data state '{state}' must declare data kind {expected}")]
    MissingDataKind {
        state: String,
        expected: &'static str,
    },

    #[error("transition declares data kind {declared} but target '{state}' expects {expected}")]
    DataKindMismatch {
        state: String,
        declared: &'static str,
        expected: &'static str,
    },

    #[error("transition declares data kind {declared} but target '{state}' is not a data state")]
    TargetNotDataState {
        state: String,
        declared: &'static str,
    },

    #[error("transition has no source state. Call .from(state)")]
    MissingSource,

    #[error("transition has no event matcher. Call .on(kind), .on_exact(kind), or .matcher(..)")]
    MissingMatcher,

    #[error("transition has no direction. Call .to(state), .stay(), or .direction(..)")]
    MissingDirection,
}
