//! Memoized selection over store transitions.
//!
//! A [`Selector`] turns a stream of transitions into a change-detected
//! output with as little recomputation as possible:
//!
//! 1. An optional filter rejects transitions that cannot matter.
//! 2. Dependency selectors extract cheap values; if none changed, stop.
//! 3. The output selector recomputes the value and its change predicate
//!    decides whether observers are notified.
//!
//! [`KeyedSelector`] resets the derivation when the owner's identity token
//! changes, and [`spawn_selection`] binds a selector to a store.

mod dependency;
mod engine;
mod keyed;
mod output;
mod selection;

pub use dependency::{Dependency, DependencySelector};
pub use engine::{Filter, Refresh, Selector};
pub use keyed::KeyedSelector;
pub use output::OutputSelector;
pub use selection::{spawn_selection, spawn_selection_with, Selection};
