//! Presentation binding: a selector driven by a store's transition stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::engine::{Refresh, Selector};
use crate::broadcast::{DeliveryPolicy, Subscription};
use crate::flow::Reducer;
use crate::lifecycle::CancelToken;
use crate::store::{Store, TransitionOf, WeakStore};

/// Cached output of a selector kept current by a background task.
///
/// Readers get the latest output from [`current`](Self::current) and wait
/// for changes with [`changed`](Self::changed). Dropping the selection stops
/// the task and releases its subscription.
///
/// If the subscriber queue drops records, the next record received resyncs
/// the selector against the store's current state instead of trusting the
/// filter, so a lost record never leaves the output stale.
pub struct Selection<O> {
    receiver: watch::Receiver<O>,
    cancel: CancelToken,
    notifications: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

/// Subscribes `selector` to `store` using the store's delivery policy.
///
/// Must be called from within a tokio runtime.
pub fn spawn_selection<R, O>(
    store: &Store<R>,
    selector: Selector<R::State, R::Action, O>,
) -> Selection<O>
where
    R: Reducer,
    O: Clone + Send + Sync + 'static,
{
    spawn_selection_with(store, selector, store.config().delivery)
}

/// Like [`spawn_selection`] with an explicit delivery policy.
pub fn spawn_selection_with<R, O>(
    store: &Store<R>,
    mut selector: Selector<R::State, R::Action, O>,
    policy: DeliveryPolicy,
) -> Selection<O>
where
    R: Reducer,
    O: Clone + Send + Sync + 'static,
{
    // Subscribe before priming so no transition slips between the two.
    let subscription = store.subscribe_with(policy);
    let initial = store.select(|state| selector.prime(state).clone());
    let (sender, receiver) = watch::channel(initial);

    let cancel = CancelToken::new();
    let notifications = Arc::new(AtomicU64::new(0));
    let task = tokio::spawn(drive(
        store.downgrade(),
        subscription,
        selector,
        sender,
        cancel.clone(),
        Arc::clone(&notifications),
    ));

    Selection {
        receiver,
        cancel,
        notifications,
        task,
    }
}

async fn drive<R, O>(
    store: WeakStore<R>,
    mut subscription: Subscription<TransitionOf<R>>,
    mut selector: Selector<R::State, R::Action, O>,
    sender: watch::Sender<O>,
    cancel: CancelToken,
    notifications: Arc<AtomicU64>,
) where
    R: Reducer,
    O: Clone + Send + Sync + 'static,
{
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
        let refresh = if missed > 0 {
            lagged += missed;
            tracing::warn!(
                subscription = %subscription.id(),
                sequence = transition.sequence(),
                missed,
                "Selection lagged, resyncing with current state"
            );
            store.select(|state| selector.resync(state))
        } else {
            store.select(|state| selector.observe(state, transition.action()))
        };
        drop(store);

        tracing::trace!(
            subscription = %subscription.id(),
            sequence = transition.sequence(),
            refresh = ?refresh,
            "Selector evaluated"
        );

        if refresh == Refresh::Changed {
            if let Some(output) = selector.output() {
                sender.send_replace(output.clone());
                notifications.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl<O: Clone> Selection<O> {
    /// Latest output.
    pub fn current(&self) -> O {
        self.receiver.borrow().clone()
    }

    /// Waits until the output changes. Returns false once the selection ended.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Independent receiver for another consumer of the same output.
    pub fn watch(&self) -> watch::Receiver<O> {
        self.receiver.clone()
    }

    /// Number of times observers were notified of a new output.
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<O> Drop for Selection<O> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}
