//! Asynchronous thunks wrapping each persistence call.
//!
//! Every thunk translates success or failure into a result action and
//! dispatches it; nothing is returned to the caller and nothing escapes.

use std::sync::Arc;

use super::action::{AnimalsAction, DataAction};
use super::persistence::AnimalsPersistence;
use super::reducer::AnimalsReducer;
use super::state::{Animal, AnimalId};
use crate::store::Store;

pub type AnimalsStore = Store<AnimalsReducer>;

pub async fn fetch_categories(store: AnimalsStore, persistence: Arc<dyn AnimalsPersistence>) {
    let result = persistence
        .fetch_categories()
        .await
        .map_err(|err| err.to_string());
    report(&store, DataAction::CategoriesFetched(result));
}

pub async fn fetch_animals(store: AnimalsStore, persistence: Arc<dyn AnimalsPersistence>) {
    let result = persistence.fetch_animals().await.map_err(|err| err.to_string());
    report(&store, DataAction::AnimalsFetched(result));
}

pub async fn add_animal(
    store: AnimalsStore,
    persistence: Arc<dyn AnimalsPersistence>,
    animal: Animal,
) {
    let id = animal.id.clone();
    let result = persistence
        .add_animal(animal)
        .await
        .map_err(|err| err.to_string());
    report(&store, DataAction::AnimalAdded { id, result });
}

pub async fn update_animal(
    store: AnimalsStore,
    persistence: Arc<dyn AnimalsPersistence>,
    animal: Animal,
) {
    let id = animal.id.clone();
    let result = persistence
        .update_animal(animal)
        .await
        .map_err(|err| err.to_string());
    report(&store, DataAction::AnimalUpdated { id, result });
}

pub async fn delete_animal(
    store: AnimalsStore,
    persistence: Arc<dyn AnimalsPersistence>,
    id: AnimalId,
) {
    let result = persistence
        .delete_animal(id.clone())
        .await
        .map_err(|err| err.to_string());
    report(&store, DataAction::AnimalDeleted { id, result });
}

fn report(store: &AnimalsStore, action: DataAction) {
    if let Some(error) = failure(&action) {
        tracing::warn!(store = %store.config().name, error, "Persistence call failed");
    }
    if let Err(err) = store.dispatch(AnimalsAction::Data(action)) {
        tracing::warn!(store = %store.config().name, error = %err, "Result action rejected");
    }
}

fn failure(action: &DataAction) -> Option<&str> {
    match action {
        DataAction::CategoriesFetched(Err(error))
        | DataAction::AnimalsFetched(Err(error))
        | DataAction::AnimalAdded {
            result: Err(error), ..
        }
        | DataAction::AnimalUpdated {
            result: Err(error), ..
        }
        | DataAction::AnimalDeleted {
            result: Err(error), ..
        } => Some(error.as_str()),
        _ => None,
    }
}
