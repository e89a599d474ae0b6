mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{calls, count, ledger, wait_until, LedgerAction, LedgerState, WAIT};
use unistate::{
    spawn_selection, spawn_selection_with, DeliveryPolicy, DependencySelector, KeyedSelector,
    OutputSelector, Refresh, Selector,
};

type LedgerSelector<O> = Selector<LedgerState, LedgerAction, O>;

fn entry_count(calls: Arc<AtomicUsize>) -> LedgerSelector<usize> {
    Selector::new(OutputSelector::distinct(move |state: &LedgerState| {
        calls.fetch_add(1, Ordering::SeqCst);
        state.entries.len()
    }))
}

fn entry_map() -> DependencySelector<LedgerState, Arc<BTreeMap<String, i64>>> {
    DependencySelector::new(
        |state: &LedgerState| Arc::clone(&state.entries),
        |previous, next| !Arc::ptr_eq(previous, next),
    )
}

/// Entries sorted by value, recomputed only when the map changes.
fn sorted_entries(calls: Arc<AtomicUsize>) -> LedgerSelector<Vec<(String, i64)>> {
    Selector::new(OutputSelector::distinct(move |state: &LedgerState| {
        calls.fetch_add(1, Ordering::SeqCst);
        let mut entries: Vec<_> = state
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        entries.sort_by_key(|(_, value)| *value);
        entries
    }))
    .depends_on(entry_map())
}

fn apply(state: &LedgerState, action: &LedgerAction) -> LedgerState {
    use unistate::Reducer;
    common::LedgerReducer::reduce(state, action).unwrap()
}

/// Without dependencies or a filter, every transition recomputes the output,
/// but an equal output notifies nobody.
#[tokio::test]
async fn test_dependency_free_selector_recomputes_without_notifying() {
    let store = ledger();
    store.dispatch(LedgerAction::insert("a", 1)).unwrap();

    let output_calls = calls();
    let selection = spawn_selection(&store, entry_count(output_calls.clone()));
    assert_eq!(selection.current(), 1);
    assert_eq!(count(&output_calls), 1);

    for _ in 0..3 {
        store.dispatch(LedgerAction::Touch).unwrap();
    }

    assert!(wait_until(|| count(&output_calls) == 4).await);
    assert_eq!(selection.notifications(), 0);
    assert_eq!(selection.current(), 1);
}

/// A new key recomputes the sorted output once; an unrelated action never does.
#[test]
fn test_map_dependency_gates_sorted_output() {
    let output_calls = calls();
    let mut selector = sorted_entries(output_calls.clone());
    let state = apply(&LedgerState::default(), &LedgerAction::insert("b", 2));
    selector.prime(&state);
    assert_eq!(count(&output_calls), 1);

    let insert = LedgerAction::insert("a", 1);
    let state = apply(&state, &insert);
    assert_eq!(selector.observe(&state, &insert), Refresh::Changed);
    assert_eq!(count(&output_calls), 2);
    assert_eq!(
        selector.output(),
        Some(&vec![("a".to_string(), 1), ("b".to_string(), 2)])
    );

    let state = apply(&state, &LedgerAction::Touch);
    assert_eq!(
        selector.observe(&state, &LedgerAction::Touch),
        Refresh::DependenciesUnchanged
    );
    assert_eq!(count(&output_calls), 2);
}

/// A rejecting filter skips the output entirely.
#[test]
fn test_filter_rejection_skips_output() {
    let output_calls = calls();
    let mut selector = entry_count(output_calls.clone())
        .with_filter(|_, action| !matches!(action, LedgerAction::Touch));
    let state = LedgerState::default();
    selector.prime(&state);

    for _ in 0..5 {
        assert_eq!(selector.observe(&state, &LedgerAction::Touch), Refresh::Filtered);
    }
    assert_eq!(count(&output_calls), 1);

    let insert = LedgerAction::insert("a", 1);
    let state = apply(&state, &insert);
    assert_eq!(selector.observe(&state, &insert), Refresh::Changed);
    assert_eq!(count(&output_calls), 2);
}

/// Unchanged dependencies return the previous output untouched.
#[test]
fn test_unchanged_dependencies_keep_cached_output() {
    let output_calls = calls();
    let mut selector = sorted_entries(output_calls.clone());
    let state = apply(&LedgerState::default(), &LedgerAction::insert("a", 1));
    let before = selector.prime(&state).clone();

    // Re-inserting the same value keeps the same map allocation.
    let same = LedgerAction::insert("a", 1);
    let next = apply(&state, &same);
    assert!(Arc::ptr_eq(&state.entries, &next.entries));
    assert_eq!(selector.observe(&next, &same), Refresh::DependenciesUnchanged);
    assert_eq!(selector.output(), Some(&before));
    assert_eq!(count(&output_calls), 1);
}

/// Several dependencies: any one changing triggers the output.
#[test]
fn test_any_changed_dependency_recomputes() {
    let output_calls = calls();
    let counted = output_calls.clone();
    let mut selector: LedgerSelector<(usize, u64)> =
        Selector::new(OutputSelector::distinct(move |state: &LedgerState| {
            counted.fetch_add(1, Ordering::SeqCst);
            (state.entries.len(), state.touches)
        }))
        .depends_on(entry_map())
        .depends_on(DependencySelector::distinct(|state: &LedgerState| state.touches));

    let state = LedgerState::default();
    selector.prime(&state);
    let state = apply(&state, &LedgerAction::Touch);
    assert_eq!(selector.observe(&state, &LedgerAction::Touch), Refresh::Changed);
    assert_eq!(selector.output(), Some(&(0, 1)));
    assert_eq!(count(&output_calls), 2);
}

/// Switching the identity key discards the old cache and recomputes once.
#[test]
fn test_identity_change_forces_one_full_recompute() {
    let dependency_calls = calls();
    let output_calls = calls();
    let (dep_counter, out_counter) = (dependency_calls.clone(), output_calls.clone());

    let mut selector = KeyedSelector::new(move |key: &String| {
        let key = key.clone();
        let dep_counter = dep_counter.clone();
        let out_counter = out_counter.clone();
        let lookup = key.clone();
        Selector::<LedgerState, LedgerAction, Option<i64>>::new(OutputSelector::distinct(
            move |state: &LedgerState| {
                out_counter.fetch_add(1, Ordering::SeqCst);
                state.entries.get(&lookup).copied()
            },
        ))
        .depends_on(DependencySelector::distinct(move |state: &LedgerState| {
            dep_counter.fetch_add(1, Ordering::SeqCst);
            state.entries.get(&key).copied()
        }))
    });

    let state = apply(&LedgerState::default(), &LedgerAction::insert("a", 1));
    let state = apply(&state, &LedgerAction::insert("b", 2));

    assert_eq!(*selector.select("a".to_string(), &state), Some(1));
    assert_eq!((count(&dependency_calls), count(&output_calls)), (1, 1));

    assert_eq!(*selector.select("a".to_string(), &state), Some(1));
    assert_eq!((count(&dependency_calls), count(&output_calls)), (1, 1));

    assert_eq!(*selector.select("b".to_string(), &state), Some(2));
    assert_eq!((count(&dependency_calls), count(&output_calls)), (2, 2));
    assert_eq!(selector.key(), Some(&"b".to_string()));
}

/// A running selection notifies only when its output actually changes.
#[tokio::test]
async fn test_selection_notifies_on_output_change() {
    let store = ledger();
    let mut selection = spawn_selection(&store, sorted_entries(calls()));
    assert!(selection.current().is_empty());

    store.dispatch(LedgerAction::Touch).unwrap();
    store.dispatch(LedgerAction::insert("k", 7)).unwrap();

    assert!(tokio::time::timeout(WAIT, selection.changed()).await.unwrap());
    assert_eq!(selection.current(), vec![("k".to_string(), 7)]);
    assert!(wait_until(|| selection.notifications() == 1).await);

    let mut watcher = selection.watch();
    store.dispatch(LedgerAction::Remove("k".into())).unwrap();
    assert!(tokio::time::timeout(WAIT, watcher.changed()).await.unwrap().is_ok());
    assert!(watcher.borrow().is_empty());
}

/// Dropping or cancelling a selection releases its subscription.
#[tokio::test]
async fn test_selection_teardown_releases_subscription() {
    let store = ledger();
    let selection = spawn_selection(&store, entry_count(calls()));
    let other = spawn_selection(&store, entry_count(calls()));
    assert_eq!(store.subscriber_count(), 2);

    drop(selection);
    assert!(wait_until(|| store.subscriber_count() == 1).await);

    other.cancel();
    assert!(wait_until(|| other.is_finished() && store.subscriber_count() == 0).await);
}

/// Store teardown ends the selection; `changed` then reports false.
#[tokio::test]
async fn test_selection_ends_with_store() {
    let store = ledger();
    let mut selection = spawn_selection(&store, entry_count(calls()));
    drop(store);
    assert!(!tokio::time::timeout(WAIT, selection.changed()).await.unwrap());
    assert_eq!(selection.current(), 0);
}

/// When the record a filter would accept is dropped, the selection resyncs
/// from current state instead of missing the change.
#[tokio::test]
async fn test_lagging_filtered_selection_resyncs() {
    let store = ledger();
    let selector = entry_count(calls())
        .with_filter(|_, action: &LedgerAction| matches!(action, LedgerAction::Insert(..)));
    let selection = spawn_selection_with(&store, selector, DeliveryPolicy::bounded(2));

    store.dispatch(LedgerAction::insert("a", 1)).unwrap();
    for _ in 0..5 {
        store.dispatch(LedgerAction::Touch).unwrap();
    }

    assert!(wait_until(|| selection.current() == 1).await);
    assert_eq!(selection.notifications(), 1);
}
