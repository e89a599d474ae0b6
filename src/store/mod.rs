//! Single-writer state container.
//!
//! The store owns the current state snapshot. Dispatches are serialized: the
//! reducer runs, the snapshot is replaced and the transition is published to
//! every subscriber before `dispatch` returns. Subscribers consume their
//! queues asynchronously, so a subscriber may still be handling transition N
//! while the store has moved on to N+3.

mod thunk;
mod transition;

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::broadcast::{BroadcastRegistry, DeliveryPolicy, Subscription};
use crate::config::StoreConfig;
use crate::flow::Reducer;

pub use transition::Transition;

/// Transition record type broadcast by a store with reducer `R`.
pub type TransitionOf<R> = Transition<<R as Reducer>::State, <R as Reducer>::Action>;

/// Shared handle to a state container.
///
/// Cloning is cheap; all clones refer to the same state. The state and every
/// subscriber queue are torn down when the last handle is dropped.
pub struct Store<R: Reducer> {
    inner: Arc<StoreInner<R>>,
}

struct StoreInner<R: Reducer> {
    config: StoreConfig,
    committed: RwLock<Committed<R::State>>,
    registry: BroadcastRegistry<TransitionOf<R>>,
}

struct Committed<S> {
    snapshot: Arc<S>,
    sequence: u64,
}

impl<R: Reducer> Store<R> {
    pub fn new(initial: R::State) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    pub fn with_config(initial: R::State, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                config,
                committed: RwLock::new(Committed {
                    snapshot: Arc::new(initial),
                    sequence: 0,
                }),
                registry: BroadcastRegistry::new(),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Applies `action` through the reducer.
    ///
    /// On success the new state is committed and `(old state, action)` is
    /// published to every subscriber before returning, even when the new
    /// state equals the old one. On failure the state is unchanged, nothing
    /// is published and the reducer's error is returned.
    pub fn dispatch(&self, action: R::Action) -> Result<(), R::Error> {
        let mut committed = self.inner.committed.write();

        let next = match R::reduce(&committed.snapshot, &action) {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!(
                    store = %self.inner.config.name,
                    action = ?action,
                    error = %err,
                    "Action rejected by reducer"
                );
                return Err(err);
            }
        };

        let old = std::mem::replace(&mut committed.snapshot, Arc::new(next));
        committed.sequence += 1;
        let transition = Transition::new(old, action, committed.sequence);

        // Published under the write lock so every queue sees dispatch order.
        let delivered = self.inner.registry.publish(transition.clone());

        if self.inner.config.trace_transitions {
            tracing::debug!(
                store = %self.inner.config.name,
                sequence = transition.sequence(),
                subscribers = delivered,
                action = ?transition.action(),
                "Transition applied"
            );
        }
        Ok(())
    }

    /// Applies `transform` to the current state.
    ///
    /// The snapshot is taken before `transform` runs, so the closure may
    /// itself use the store.
    pub fn select<T>(&self, transform: impl FnOnce(&R::State) -> T) -> T {
        let snapshot = self.state();
        transform(&snapshot)
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<R::State> {
        Arc::clone(&self.inner.committed.read().snapshot)
    }

    /// Number of accepted transitions so far.
    pub fn sequence(&self) -> u64 {
        self.inner.committed.read().sequence
    }

    /// Subscribes with the configured default delivery policy.
    pub fn subscribe(&self) -> Subscription<TransitionOf<R>> {
        self.subscribe_with(self.inner.config.delivery)
    }

    /// Subscribes with an explicit delivery policy.
    ///
    /// The subscriber sees every transition accepted after this call, in order.
    pub fn subscribe_with(&self, policy: DeliveryPolicy) -> Subscription<TransitionOf<R>> {
        let (subscription, _token) = self.inner.registry.register(policy);
        subscription
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Non-owning handle for tasks that must not keep the store alive.
    pub fn downgrade(&self) -> WeakStore<R> {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Reducer> fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.config.name)
            .field("sequence", &self.sequence())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Weak counterpart of [`Store`].
pub struct WeakStore<R: Reducer> {
    inner: Weak<StoreInner<R>>,
}

impl<R: Reducer> WeakStore<R> {
    pub fn upgrade(&self) -> Option<Store<R>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl<R: Reducer> Clone for WeakStore<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}
