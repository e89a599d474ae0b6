//! Animals: a category/animal catalog backed by an asynchronous persistence
//! collaborator.
//!
//! The reducer never touches persistence. Lists move into
//! [`Status::Waiting`] when they appear, mutations apply optimistically and
//! queue a pending [`Mutation`], and [`AnimalsListener`] turns those markers
//! into thunks whose result actions commit or roll back the change.

mod action;
mod listener;
mod persistence;
mod reducer;
pub mod selectors;
mod state;
pub mod thunks;

pub use action::{AnimalsAction, DataAction, SystemAction, UiAction};
pub use listener::AnimalsListener;
pub use persistence::{AnimalsPersistence, InMemoryPersistence, PersistenceError};
pub use reducer::{AnimalsError, AnimalsReducer};
pub use state::{
    Animal, AnimalId, Animals, AnimalsState, Categories, Category, CategoryId, Diet, Mutation,
    Status,
};
