//! Builder API for assembling machines.
//!
//! [`MachineBuilder`] owns the tree while it is under construction and is
//! consumed by `build()`, which validates the definition and freezes it.
//! Transitions come in through the fluent [`TransitionBuilder`].

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::ConfigError;
pub use machine::MachineBuilder;
pub use transition::TransitionBuilder;

use crate::core::{EventKind, StateId};

/// Shorthand for a plain `from --kind--> to` transition.
///
/// # Example
///
/// ```
/// use statree::builder::transition_to;
/// use statree::MachineBuilder;
///
/// let mut b = MachineBuilder::new("lamp");
/// let off = b.add_state(b.root(), "Off").unwrap();
/// let on = b.add_state(b.root(), "On").unwrap();
/// b.set_initial(b.root(), off).unwrap();
/// b.transition(transition_to(off, "Toggle", on)).unwrap();
/// b.transition(transition_to(on, "Toggle", off)).unwrap();
/// let machine = b.build().unwrap();
/// ```
pub fn transition_to(
    from: StateId,
    kind: impl Into<EventKind>,
    to: StateId,
) -> TransitionBuilder {
    TransitionBuilder::new().from(from).on(kind).to(to)
}

/// Shorthand for a targetless transition: the firing notification runs,
/// the active state set does not change.
pub fn stay_on(from: StateId, kind: impl Into<EventKind>) -> TransitionBuilder {
    TransitionBuilder::new().from(from).on(kind).stay()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Event;

    #[test]
    fn shorthand_builders_run() {
        let mut b = MachineBuilder::new("lamp");
        let off = b.add_state(b.root(), "Off").unwrap();
        let on = b.add_state(b.root(), "On").unwrap();
        b.set_initial(b.root(), off).unwrap();
        b.transition(transition_to(off, "Toggle", on)).unwrap();
        b.transition(stay_on(on, "Toggle")).unwrap();

        let mut machine = b.build().unwrap();
        machine.start().unwrap();

        machine.process_event(Event::new("Toggle")).unwrap();
        assert_eq!(machine.active_leaves(), vec![on]);

        // The stay transition fires but never leaves `On`.
        machine.process_event(Event::new("Toggle")).unwrap();
        assert_eq!(machine.active_leaves(), vec![on]);
    }
}
