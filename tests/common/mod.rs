//! Shared test utilities: a small keyed-entry store and async wait helpers.

#![allow(dead_code, unused_imports)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use unistate::{Action, Reducer, State, Store};

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// Installs the crate's tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = unistate::logging::init_tracing();
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LedgerState {
    pub entries: Arc<BTreeMap<String, i64>>,
    /// Bumped by actions unrelated to `entries`.
    pub touches: u64,
}

impl State for LedgerState {}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerAction {
    Insert(String, i64),
    Remove(String),
    Touch,
}

impl Action for LedgerAction {}

impl LedgerAction {
    pub fn insert(key: &str, value: i64) -> Self {
        Self::Insert(key.to_string(), value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("No entry '{0}'")]
    Missing(String),
}

pub struct LedgerReducer;

impl Reducer for LedgerReducer {
    type State = LedgerState;
    type Action = LedgerAction;
    type Error = LedgerError;

    fn reduce(state: &Self::State, action: &Self::Action) -> Result<Self::State, Self::Error> {
        let mut next = state.clone();
        match action {
            LedgerAction::Insert(key, value) => {
                if state.entries.get(key) != Some(value) {
                    Arc::make_mut(&mut next.entries).insert(key.clone(), *value);
                }
            }
            LedgerAction::Remove(key) => {
                if !state.entries.contains_key(key) {
                    return Err(LedgerError::Missing(key.clone()));
                }
                Arc::make_mut(&mut next.entries).remove(key);
            }
            LedgerAction::Touch => next.touches += 1,
        }
        Ok(next)
    }
}

pub type LedgerStore = Store<LedgerReducer>;

pub fn ledger() -> LedgerStore {
    Store::new(LedgerState::default())
}

/// Shared counter for instrumenting selector closures.
pub fn calls() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn count(calls: &AtomicUsize) -> usize {
    calls.load(Ordering::SeqCst)
}

/// Polls `condition` until it holds or [`WAIT`] elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
