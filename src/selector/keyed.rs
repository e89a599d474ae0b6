use std::collections::HashMap;
use std::hash::Hash;

use super::engine::{Refresh, Selector};

type Build<K, S, A, O> = Box<dyn Fn(&K) -> Selector<S, A, O> + Send + Sync>;

/// Selector cache keyed by an identity token supplied by its owner.
///
/// Selections are often parameterized (which category is being shown).
/// When the owner switches to a different key, the derivation cached for
/// the old key is evicted and a fresh selector is built, so a stale output
/// from the previous parameters is never served.
pub struct KeyedSelector<K, S, A, O> {
    build: Build<K, S, A, O>,
    entries: HashMap<K, Selector<S, A, O>>,
    current: Option<K>,
}

impl<K, S, A, O> KeyedSelector<K, S, A, O>
where
    K: Eq + Hash + Clone,
    S: 'static,
    A: 'static,
{
    pub fn new(build: impl Fn(&K) -> Selector<S, A, O> + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
            entries: HashMap::new(),
            current: None,
        }
    }

    pub fn key(&self) -> Option<&K> {
        self.current.as_ref()
    }

    /// Points the cache at `key`. Returns true if the key changed.
    pub fn rekey(&mut self, key: K) -> bool {
        if self.current.as_ref() == Some(&key) {
            return false;
        }
        if let Some(previous) = self.current.replace(key) {
            self.entries.remove(&previous);
        }
        true
    }

    /// Output for `key`, rebuilding and priming the selector if the key changed.
    pub fn select(&mut self, key: K, state: &S) -> &O {
        self.rekey(key.clone());
        let build = &self.build;
        self.entries
            .entry(key)
            .or_insert_with_key(|key| build(key))
            .current(state)
    }

    /// Feeds a transition to the selector for the current key.
    ///
    /// Without a key there is nothing to recompute.
    pub fn observe(&mut self, state: &S, action: &A) -> Refresh {
        let Some(key) = &self.current else {
            return Refresh::Filtered;
        };
        let build = &self.build;
        self.entries
            .entry(key.clone())
            .or_insert_with_key(|key| build(key))
            .observe(state, action)
    }

    /// Cached output for the current key, if primed.
    pub fn output(&self) -> Option<&O> {
        self.current
            .as_ref()
            .and_then(|key| self.entries.get(key))
            .and_then(Selector::output)
    }
}
