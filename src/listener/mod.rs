//! Side-effect orchestration.
//!
//! A [`Listener`] is a long-lived subscriber that looks at each
//! `(old state, action)` record next to the store's current state and
//! decides whether to kick off asynchronous work. The work itself runs as a
//! thunk (usually [`Store::spawn_thunk`]) so the listening loop never waits
//! on I/O, and the thunk reports its outcome by dispatching a result action
//! that loops back through this same listener.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::broadcast::{DeliveryPolicy, Subscription};
use crate::flow::Reducer;
use crate::lifecycle::CancelToken;
use crate::store::{Store, TransitionOf, WeakStore};

/// Reacts to transitions of a store with reducer `R`.
pub trait Listener<R: Reducer>: Send + 'static {
    /// Called once per transition, in dispatch order.
    ///
    /// `store` is live: `store.state()` may already be several transitions
    /// ahead of the state produced by `action`.
    fn on_transition(&mut self, old: &R::State, action: &R::Action, store: &Store<R>);

    /// Called before the next record when `missed` records were dropped by a
    /// lossy delivery policy.
    ///
    /// The dropped records may have carried the transition that should have
    /// started some work. Implementations reconcile against `store.state()`.
    fn on_lagged(&mut self, _missed: u64, _store: &Store<R>) {}
}

impl<R, F> Listener<R> for F
where
    R: Reducer,
    F: FnMut(&R::State, &R::Action, &Store<R>) + Send + 'static,
{
    fn on_transition(&mut self, old: &R::State, action: &R::Action, store: &Store<R>) {
        self(old, action, store)
    }
}

/// Owner handle of a running listener. Dropping it stops the listener.
pub struct ListenerHandle {
    cancel: CancelToken,
    counters: Arc<Counters>,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    missed: AtomicU64,
}

/// Subscribes `listener` to `store` and runs it on the tokio runtime.
///
/// Uses the store's `listener_delivery` policy, which is unbounded unless
/// configured otherwise. The task holds the store weakly; it ends when the
/// handle is cancelled or dropped, or when the store itself goes away.
pub fn spawn_listener<R, L>(store: &Store<R>, listener: L) -> ListenerHandle
where
    R: Reducer,
    L: Listener<R>,
{
    spawn_listener_with(store, listener, store.config().listener_delivery)
}

/// Like [`spawn_listener`] with an explicit delivery policy.
///
/// With a lossy policy, dropped records are reported through
/// [`Listener::on_lagged`].
pub fn spawn_listener_with<R, L>(
    store: &Store<R>,
    listener: L,
    policy: DeliveryPolicy,
) -> ListenerHandle
where
    R: Reducer,
    L: Listener<R>,
{
    let subscription = store.subscribe_with(policy);
    let cancel = CancelToken::new();
    let counters = Arc::new(Counters::default());

    let task = tokio::spawn(listen(
        store.downgrade(),
        subscription,
        listener,
        cancel.clone(),
        Arc::clone(&counters),
    ));

    ListenerHandle {
        cancel,
        counters,
        task: Some(task),
    }
}

async fn listen<R, L>(
    store: WeakStore<R>,
    mut subscription: Subscription<TransitionOf<R>>,
    mut listener: L,
    cancel: CancelToken,
    counters: Arc<Counters>,
) where
    R: Reducer,
    L: Listener<R>,
{
    tracing::debug!(
        subscription = %subscription.id(),
        policy = ?subscription.policy(),
        "Listener started"
    );
    let mut lagged = subscription.lagged();
    loop {
        let transition = tokio::select! {
            _ = cancel.cancelled() => break,
            next = subscription.recv() => match next {
                Some(transition) => transition,
                None => break,
            },
        };

        let Some(store) = store.upgrade() else {
            break;
        };

        let missed = subscription.lagged() - lagged;
        if missed > 0 {
            lagged += missed;
            counters.missed.fetch_add(missed, Ordering::Relaxed);
            tracing::warn!(
                subscription = %subscription.id(),
                sequence = transition.sequence(),
                missed,
                "Listener lagged, records were dropped"
            );
        }

        // A panicking callback must not end the subscription.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            if missed > 0 {
                listener.on_lagged(missed, &store);
            }
            listener.on_transition(transition.old_state(), transition.action(), &store)
        }));
        drop(store);

        if outcome.is_err() {
            tracing::error!(
                subscription = %subscription.id(),
                sequence = transition.sequence(),
                action = ?transition.action(),
                "Listener panicked while handling transition"
            );
        }
        counters.processed.fetch_add(1, Ordering::Relaxed);
    }
    tracing::debug!(subscription = %subscription.id(), "Listener stopped");
}

impl ListenerHandle {
    /// Stops the listener after the record it is handling, if any.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Transitions handled so far.
    pub fn processed(&self) -> u64 {
        self.counters.processed.load(Ordering::Relaxed)
    }

    /// Records dropped by the delivery policy before the listener saw them.
    pub fn missed(&self) -> u64 {
        self.counters.missed.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancels the listener and waits for its task to exit.
    pub async fn join(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "Listener task ended abnormally");
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
