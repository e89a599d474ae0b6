//! Counter: the smallest complete store.

use thiserror::Error;

use crate::flow::{Action, Reducer, State};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CounterState {
    pub value: i64,
}

impl State for CounterState {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    Increment,
    Decrement,
}

impl Action for CounterAction {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    #[error("Counter would overflow from {value}")]
    Overflow { value: i64 },
}

pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;
    type Error = CounterError;

    fn reduce(state: &Self::State, action: &Self::Action) -> Result<Self::State, Self::Error> {
        let value = match action {
            CounterAction::Increment => state.value.checked_add(1),
            CounterAction::Decrement => state.value.checked_sub(1),
        }
        .ok_or(CounterError::Overflow { value: state.value })?;
        Ok(CounterState { value })
    }
}
