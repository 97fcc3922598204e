//! Transition resolution.
//!
//! For every active leaf the resolver walks leaf to root and picks the
//! first transition whose matcher accepts the event and whose guard
//! passes — the transition nearest the leaf wins, so child-defined
//! transitions shadow ancestor-defined ones for the same event kind
//! family. The chosen transition's direction resolver then decides what
//! actually happens; a `NoTransition` resolution consumes the event for
//! that leaf without falling through to an ancestor.

use crate::core::{ArgValue, Direction, Event, StateId, StateTree, Transition, TransitionId};
use std::collections::{HashMap, HashSet};

/// One transition that will fire for one active leaf.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ResolvedFiring {
    pub transition: TransitionId,
    pub leaf: StateId,
    pub direction: Direction,
}

/// Resolve the firings for one event against the current active leaf set.
///
/// Leaves under parallel ancestors resolve independently, at most one
/// firing each; a transition reached from several leaves (its source is a
/// shared ancestor) fires only once.
pub(crate) fn resolve_firings(
    tree: &StateTree,
    transitions: &[Transition],
    by_source: &HashMap<StateId, Vec<TransitionId>>,
    event: &Event,
    argument: Option<&ArgValue>,
) -> Vec<ResolvedFiring> {
    let mut firings = Vec::new();
    let mut claimed: HashSet<TransitionId> = HashSet::new();

    for leaf in tree.active_leaves() {
        let chain = std::iter::once(leaf).chain(tree.ancestors(leaf));
        'leaf: for node in chain {
            let Some(candidates) = by_source.get(&node) else {
                continue;
            };
            for &id in candidates {
                let transition = &transitions[id];
                if !transition.accepts(event, argument) {
                    continue;
                }
                // Nearest match wins whatever its direction resolves to.
                match transition.resolve(event, argument) {
                    Direction::NoTransition => {}
                    direction => {
                        if claimed.insert(id) {
                            firings.push(ResolvedFiring {
                                transition: id,
                                leaf,
                                direction,
                            });
                        }
                    }
                }
                break 'leaf;
            }
        }
    }

    firings
}
