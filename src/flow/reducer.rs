//! Reducer trait.

use super::action::Action;
use super::state::State;

/// Reducer computes the next state from the current one and an action.
///
/// The reducer is the only place where state transitions happen. It must be
/// deterministic, synchronous and free of I/O: `(State, Action) -> State`.
/// A rejected action leaves the store untouched and the error is handed back
/// to whoever dispatched it.
pub trait Reducer: Send + Sync + 'static {
    /// The state type this reducer operates on.
    type State: State;

    /// The action type this reducer handles.
    type Action: Action;

    /// Error returned when an action cannot be applied.
    ///
    /// Use [`std::convert::Infallible`] for reducers that accept everything.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Process an action and return the new state.
    fn reduce(state: &Self::State, action: &Self::Action) -> Result<Self::State, Self::Error>;
}
