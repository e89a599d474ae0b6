mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{wait_until, WAIT};
use unistate::apps::animals::selectors;
use unistate::apps::animals::thunks::AnimalsStore;
use unistate::apps::animals::{
    Animal, AnimalId, AnimalsAction, AnimalsError, AnimalsListener, AnimalsState, CategoryId,
    DataAction, Diet, InMemoryPersistence, Status, SystemAction, UiAction,
};
use unistate::{
    spawn_listener, spawn_listener_with, spawn_selection, DeliveryPolicy, ListenerHandle, Store,
};

fn setup(persistence: &Arc<InMemoryPersistence>) -> (AnimalsStore, ListenerHandle) {
    let store = Store::new(AnimalsState::default());
    let handle = spawn_listener(&store, AnimalsListener::new(persistence.clone()));
    (store, handle)
}

async fn load_all(store: &AnimalsStore) {
    store.dispatch(UiAction::CategoryListAppeared.into()).unwrap();
    store.dispatch(UiAction::AnimalListAppeared.into()).unwrap();
    assert!(
        wait_until(|| {
            let state = store.state();
            state.categories.status == Some(Status::Success)
                && state.animals.status == Some(Status::Success)
        })
        .await
    );
}

/// Appearing lists move to waiting, then the listener fetches and commits them.
#[tokio::test]
async fn test_appear_fetches_lists() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, _listener) = setup(&persistence);

    store.dispatch(UiAction::CategoryListAppeared.into()).unwrap();
    assert_eq!(store.state().categories.status, Some(Status::Waiting));

    load_all(&store).await;
    let state = store.state();
    assert_eq!(state.categories.data.len(), 3);
    assert_eq!(state.animals.data.len(), 6);
    assert_eq!(persistence.calls(), 2);
}

/// Loaded lists are not fetched again when they reappear.
#[tokio::test]
async fn test_reappearing_list_is_not_refetched() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, listener) = setup(&persistence);
    load_all(&store).await;

    store.dispatch(UiAction::CategoryListAppeared.into()).unwrap();
    let sequence = store.sequence();
    assert!(wait_until(|| listener.processed() == sequence).await);
    assert_eq!(persistence.calls(), 2);
}

/// A failed fetch lands in state as a failure and the listener carries on.
#[tokio::test]
async fn test_failed_fetch_is_reported_and_listener_survives() {
    common::init_tracing();
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, listener) = setup(&persistence);
    let mut records = store.subscribe();

    persistence.set_failing(true);
    store.dispatch(UiAction::CategoryListAppeared.into()).unwrap();

    assert!(
        wait_until(|| matches!(
            store.state().categories.status,
            Some(Status::Failure { .. })
        ))
        .await
    );
    let _appeared = records.try_recv().expect("appear record");
    let failure = tokio::time::timeout(WAIT, records.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        failure.action(),
        AnimalsAction::Data(DataAction::CategoriesFetched(Err(message))) if message.contains("simulated outage")
    ));

    // Failure is retryable and the same listener handles the retry.
    persistence.set_failing(false);
    store.dispatch(UiAction::CategoryListAppeared.into()).unwrap();
    assert!(wait_until(|| store.state().categories.status == Some(Status::Success)).await);
    assert!(!listener.is_finished());
    assert_eq!(store.state().categories.data.len(), 3);
}

#[tokio::test]
async fn test_refresh_reloads_both_lists() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, _listener) = setup(&persistence);
    load_all(&store).await;

    store.dispatch(SystemAction::Refresh.into()).unwrap();
    assert!(wait_until(|| persistence.calls() == 4).await);
    assert!(
        wait_until(|| {
            let state = store.state();
            state.categories.status == Some(Status::Success)
                && state.animals.status == Some(Status::Success)
        })
        .await
    );
}

/// Adds apply immediately and commit once persistence confirms them.
#[tokio::test]
async fn test_optimistic_add_commits() {
    let persistence = Arc::new(
        InMemoryPersistence::sample().with_latency(Duration::from_millis(20)),
    );
    let (store, _listener) = setup(&persistence);
    load_all(&store).await;

    let action = UiAction::add("Frog", Diet::Carnivorous, CategoryId::from("amphibian"));
    let UiAction::AddAnimal(frog) = &action else {
        unreachable!("add builds an AddAnimal action");
    };
    let id = frog.id.clone();
    store.dispatch(action.into()).unwrap();

    assert!(store.state().animal(&id).is_some());
    assert!(store.state().is_pending(&id));

    assert!(wait_until(|| store.state().mutation_status(&id).is_none()).await);
    assert_eq!(store.state().animal(&id).map(|a| a.name.as_str()), Some("Frog"));
    assert_eq!(persistence.animal_count(), 7);
}

/// A failed update restores the previous value and records the failure.
#[tokio::test]
async fn test_failed_update_rolls_back() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, _listener) = setup(&persistence);
    load_all(&store).await;

    let cat_id = AnimalId::from("cat");
    let original = store.state().animal(&cat_id).cloned().unwrap();
    let renamed = Animal {
        name: "Tiger".to_string(),
        ..original.clone()
    };

    persistence.set_failing(true);
    store.dispatch(UiAction::UpdateAnimal(renamed).into()).unwrap();
    assert_eq!(
        store.state().animal(&cat_id).map(|a| a.name.clone()),
        Some("Tiger".to_string())
    );

    assert!(
        wait_until(|| matches!(
            store.state().mutation_status(&cat_id),
            Some(Status::Failure { .. })
        ))
        .await
    );
    assert_eq!(store.state().animal(&cat_id), Some(&original));
}

#[tokio::test]
async fn test_delete_commits_and_second_change_is_rejected_while_pending() {
    let persistence = Arc::new(
        InMemoryPersistence::sample().with_latency(Duration::from_millis(50)),
    );
    let (store, _listener) = setup(&persistence);
    load_all(&store).await;

    let dog = AnimalId::from("dog");
    store.dispatch(UiAction::DeleteAnimal(dog.clone()).into()).unwrap();
    assert!(store.state().animal(&dog).is_none());

    let err = store
        .dispatch(UiAction::DeleteAnimal(dog.clone()).into())
        .unwrap_err();
    assert_eq!(err, AnimalsError::MutationPending { id: dog.clone() });

    assert!(wait_until(|| store.state().mutation_status(&dog).is_none()).await);
    assert_eq!(persistence.animal_count(), 5);
}

#[tokio::test]
async fn test_unknown_category_is_rejected_once_loaded() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, _listener) = setup(&persistence);
    load_all(&store).await;

    let err = store
        .dispatch(UiAction::add("Shark", Diet::Carnivorous, CategoryId::from("fish")).into())
        .unwrap_err();
    assert_eq!(
        err,
        AnimalsError::CategoryNotFound {
            id: CategoryId::from("fish")
        }
    );
}

/// Category and per-category selections follow the fetched data.
#[tokio::test]
async fn test_selections_follow_loaded_catalog() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, _listener) = setup(&persistence);

    let categories = spawn_selection(&store, selectors::sorted_categories());
    let mammals = spawn_selection(
        &store,
        selectors::animals_in_category(CategoryId::from("mammal")),
    );
    let count = spawn_selection(&store, selectors::animal_count());
    assert!(categories.current().is_empty());

    load_all(&store).await;

    assert!(wait_until(|| categories.current().len() == 3).await);
    let names: Vec<_> = categories.current().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Amphibian", "Bird", "Mammal"]);

    assert!(wait_until(|| mammals.current().len() == 3).await);
    let names: Vec<_> = mammals.current().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["Bumblebee Bat", "Cat", "Dog"]);

    assert!(wait_until(|| count.current() == 6).await);
    assert!(wait_until(|| categories.notifications() == 1).await);
}

/// A burst larger than the broadcast queue still reaches the listener, so
/// the first appear starts exactly one fetch.
#[tokio::test]
async fn test_appear_burst_starts_one_fetch() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, listener) = setup(&persistence);

    for _ in 0..1100 {
        store.dispatch(UiAction::CategoryListAppeared.into()).unwrap();
    }

    assert!(wait_until(|| store.state().categories.status == Some(Status::Success)).await);
    let sequence = store.sequence();
    assert!(wait_until(|| listener.processed() == sequence).await);
    assert_eq!(listener.missed(), 0);
    assert_eq!(persistence.calls(), 1);
}

/// With a lossy queue the record that entered `Waiting` is dropped, and the
/// listener restarts the fetch from current state.
#[tokio::test]
async fn test_dropped_appear_is_reconciled() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let store = Store::new(AnimalsState::default());
    let listener = spawn_listener_with(
        &store,
        AnimalsListener::new(persistence.clone()),
        DeliveryPolicy::bounded(2),
    );

    for _ in 0..1100 {
        store.dispatch(UiAction::CategoryListAppeared.into()).unwrap();
    }

    assert!(wait_until(|| store.state().categories.status == Some(Status::Success)).await);
    assert!(listener.missed() > 0);
    assert_eq!(persistence.calls(), 1);
}

/// A dropped add still reaches persistence once the listener catches up.
#[tokio::test]
async fn test_dropped_mutation_is_reconciled() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let store = Store::new(AnimalsState::default());
    let listener = spawn_listener_with(
        &store,
        AnimalsListener::new(persistence.clone()),
        DeliveryPolicy::bounded(2),
    );
    load_all(&store).await;

    let action = UiAction::add("Newt", Diet::Carnivorous, CategoryId::from("amphibian"));
    let UiAction::AddAnimal(newt) = &action else {
        unreachable!("add builds an AddAnimal action");
    };
    let id = newt.id.clone();
    store.dispatch(action.into()).unwrap();
    for _ in 0..5 {
        store.dispatch(UiAction::AnimalListAppeared.into()).unwrap();
    }

    assert!(wait_until(|| store.state().mutation_status(&id).is_none()).await);
    assert!(listener.missed() > 0);
    assert_eq!(persistence.animal_count(), 7);
}

/// A failed add can be dismissed once seen.
#[tokio::test]
async fn test_failed_add_can_be_dismissed() {
    let persistence = Arc::new(InMemoryPersistence::sample());
    let (store, _listener) = setup(&persistence);
    load_all(&store).await;

    persistence.set_failing(true);
    let action = UiAction::add("Toad", Diet::Carnivorous, CategoryId::from("amphibian"));
    let UiAction::AddAnimal(toad) = &action else {
        unreachable!("add builds an AddAnimal action");
    };
    let id = toad.id.clone();
    store.dispatch(action.into()).unwrap();

    assert!(
        wait_until(|| matches!(store.state().mutation_status(&id), Some(Status::Failure { .. })))
            .await
    );
    assert!(store.state().animal(&id).is_none());

    store.dispatch(UiAction::DismissFailure(id.clone()).into()).unwrap();
    assert!(store.state().mutation_status(&id).is_none());
    assert!(matches!(
        store.dispatch(UiAction::DismissFailure(id.clone()).into()),
        Err(AnimalsError::NoFailedMutation { .. })
    ));
}
