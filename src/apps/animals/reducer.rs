use std::sync::Arc;

use thiserror::Error;

use super::action::{AnimalsAction, DataAction, SystemAction, UiAction};
use super::state::{Animal, AnimalId, AnimalsState, CategoryId, Mutation, Status};
use crate::flow::Reducer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimalsError {
    #[error("Animal '{id}' already exists")]
    AnimalExists { id: AnimalId },

    #[error("Animal '{id}' not found")]
    AnimalNotFound { id: AnimalId },

    #[error("Category '{id}' not found")]
    CategoryNotFound { id: CategoryId },

    #[error("Animal '{id}' already has a pending change")]
    MutationPending { id: AnimalId },

    #[error("No pending change for animal '{id}'")]
    NoPendingMutation { id: AnimalId },

    #[error("No failed change to dismiss for animal '{id}'")]
    NoFailedMutation { id: AnimalId },
}

pub struct AnimalsReducer;

impl Reducer for AnimalsReducer {
    type State = AnimalsState;
    type Action = AnimalsAction;
    type Error = AnimalsError;

    fn reduce(state: &Self::State, action: &Self::Action) -> Result<Self::State, Self::Error> {
        match action {
            AnimalsAction::Ui(action) => reduce_ui(state, action),
            AnimalsAction::System(action) => Ok(reduce_system(state, action)),
            AnimalsAction::Data(action) => reduce_data(state, action),
        }
    }
}

fn reduce_ui(state: &AnimalsState, action: &UiAction) -> Result<AnimalsState, AnimalsError> {
    let mut next = state.clone();
    match action {
        UiAction::CategoryListAppeared => {
            if needs_load(&next.categories.status) {
                next.categories.status = Some(Status::Waiting);
            }
        }
        UiAction::AnimalListAppeared => {
            if needs_load(&next.animals.status) {
                next.animals.status = Some(Status::Waiting);
            }
        }
        UiAction::AddAnimal(animal) => {
            if state.animal(&animal.id).is_some() {
                return Err(AnimalsError::AnimalExists {
                    id: animal.id.clone(),
                });
            }
            ensure_category(state, &animal.category_id)?;
            begin_mutation(&mut next, animal.id.clone(), None);
            Arc::make_mut(&mut next.animals.data).insert(animal.id.clone(), animal.clone());
        }
        UiAction::UpdateAnimal(animal) => {
            let previous = existing(state, &animal.id)?;
            ensure_category(state, &animal.category_id)?;
            begin_mutation(&mut next, animal.id.clone(), Some(previous));
            Arc::make_mut(&mut next.animals.data).insert(animal.id.clone(), animal.clone());
        }
        UiAction::DeleteAnimal(id) => {
            let previous = existing(state, id)?;
            begin_mutation(&mut next, id.clone(), Some(previous));
            Arc::make_mut(&mut next.animals.data).remove(id);
        }
        UiAction::DismissFailure(id) => {
            if !matches!(state.mutation_status(id), Some(Status::Failure { .. })) {
                return Err(AnimalsError::NoFailedMutation { id: id.clone() });
            }
            Arc::make_mut(&mut next.animals.queue).remove(id);
        }
    }
    Ok(next)
}

fn reduce_system(state: &AnimalsState, action: &SystemAction) -> AnimalsState {
    let mut next = state.clone();
    match action {
        SystemAction::Refresh => {
            if next.categories.status != Some(Status::Waiting) {
                next.categories.status = Some(Status::Waiting);
            }
            if next.animals.status != Some(Status::Waiting) {
                next.animals.status = Some(Status::Waiting);
            }
        }
    }
    next
}

fn reduce_data(state: &AnimalsState, action: &DataAction) -> Result<AnimalsState, AnimalsError> {
    let mut next = state.clone();
    match action {
        DataAction::CategoriesFetched(Ok(categories)) => {
            next.categories.data = Arc::new(
                categories
                    .iter()
                    .map(|category| (category.id.clone(), category.clone()))
                    .collect(),
            );
            next.categories.status = Some(Status::Success);
        }
        DataAction::CategoriesFetched(Err(error)) => {
            next.categories.status = Some(Status::Failure {
                error: error.clone(),
            });
        }
        DataAction::AnimalsFetched(Ok(animals)) => {
            next.animals.data = Arc::new(
                animals
                    .iter()
                    .map(|animal| (animal.id.clone(), animal.clone()))
                    .collect(),
            );
            next.animals.status = Some(Status::Success);
            forget_failures(&mut next);
        }
        DataAction::AnimalsFetched(Err(error)) => {
            next.animals.status = Some(Status::Failure {
                error: error.clone(),
            });
        }
        DataAction::AnimalAdded { id, result } | DataAction::AnimalUpdated { id, result } => {
            settle(&mut next, id, result.clone().map(Some))?;
        }
        DataAction::AnimalDeleted { id, result } => {
            settle(&mut next, id, result.clone().map(|()| None))?;
        }
    }
    Ok(next)
}

/// Drops failed mutations for animals the fresh data no longer contains.
fn forget_failures(next: &mut AnimalsState) {
    let stale = next.animals.queue.iter().any(|(id, mutation)| {
        matches!(mutation.status, Status::Failure { .. }) && !next.animals.data.contains_key(id)
    });
    if !stale {
        return;
    }
    let data = Arc::clone(&next.animals.data);
    Arc::make_mut(&mut next.animals.queue).retain(|id, mutation| {
        !matches!(mutation.status, Status::Failure { .. }) || data.contains_key(id)
    });
}

fn needs_load(status: &Option<Status>) -> bool {
    matches!(status, None | Some(Status::Failure { .. }))
}

fn existing(state: &AnimalsState, id: &AnimalId) -> Result<Animal, AnimalsError> {
    if state.is_pending(id) {
        return Err(AnimalsError::MutationPending { id: id.clone() });
    }
    state
        .animal(id)
        .cloned()
        .ok_or_else(|| AnimalsError::AnimalNotFound { id: id.clone() })
}

/// Category references are only checked once categories have loaded.
fn ensure_category(state: &AnimalsState, id: &CategoryId) -> Result<(), AnimalsError> {
    if state.categories.status == Some(Status::Success) && state.category(id).is_none() {
        return Err(AnimalsError::CategoryNotFound { id: id.clone() });
    }
    Ok(())
}

fn begin_mutation(next: &mut AnimalsState, id: AnimalId, previous: Option<Animal>) {
    Arc::make_mut(&mut next.animals.queue).insert(
        id,
        Mutation {
            status: Status::Waiting,
            previous,
        },
    );
}

/// Commits (`Ok(Some)` stores, `Ok(None)` keeps removed) or rolls back a pending mutation.
fn settle(
    next: &mut AnimalsState,
    id: &AnimalId,
    result: Result<Option<Animal>, String>,
) -> Result<(), AnimalsError> {
    if !next.is_pending(id) {
        return Err(AnimalsError::NoPendingMutation { id: id.clone() });
    }
    let queue = Arc::make_mut(&mut next.animals.queue);
    let previous = queue.remove(id).and_then(|mutation| mutation.previous);
    let data = Arc::make_mut(&mut next.animals.data);

    match result {
        Ok(Some(animal)) => {
            data.insert(id.clone(), animal);
        }
        Ok(None) => {
            // A fetch may have restored the entry while the delete was pending.
            data.remove(id);
        }
        Err(error) => {
            match previous {
                Some(animal) => data.insert(id.clone(), animal),
                None => data.remove(id),
            };
            queue.insert(
                id.clone(),
                Mutation {
                    status: Status::Failure { error },
                    previous: None,
                },
            );
        }
    }
    Ok(())
}
