//! Fan-out of transition records to independent subscribers.
//!
//! The registry owns one [`DeliveryQueue`](queue) per subscriber. Publishing
//! pushes a clone of the record into every queue without waiting on any
//! consumer; each queue applies its own [`DeliveryPolicy`] when full.
//!
//! Subscribers hold only a weak reference back to the registry:
//! - Dropping a [`Subscription`] unregisters it.
//! - [`SubscriptionToken::cancel`] unregisters it from anywhere.
//! - Dropping the registry closes every queue; streams end once drained.

mod policy;
mod queue;

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_core::Stream;
use parking_lot::Mutex;

use queue::{Delivery, DeliveryQueue};

pub use policy::{DeliveryPolicy, OverflowPolicy, DEFAULT_QUEUE_CAPACITY};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique subscription identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

trait Unregister: Send + Sync {
    fn unregister(&self, id: SubscriptionId) -> bool;
}

struct Registry<T> {
    queues: HashMap<SubscriptionId, Arc<DeliveryQueue<T>>>,
}

impl<T> Drop for Registry<T> {
    fn drop(&mut self) {
        for queue in self.queues.values() {
            queue.close();
        }
    }
}

impl<T: Send + 'static> Unregister for Mutex<Registry<T>> {
    fn unregister(&self, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let Some(queue) = registry.queues.remove(&id) else {
            return false;
        };
        queue.close();
        tracing::debug!(
            subscription = %id,
            subscribers = registry.queues.len(),
            "Subscriber removed"
        );
        true
    }
}

/// Registry of subscriber queues.
pub struct BroadcastRegistry<T> {
    shared: Arc<Mutex<Registry<T>>>,
}

impl<T: Clone + Send + 'static> BroadcastRegistry<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Registry {
                queues: HashMap::new(),
            })),
        }
    }

    /// Allocates a new delivery queue.
    ///
    /// Returns the consuming stream and a token that can cancel it.
    pub fn register(&self, policy: DeliveryPolicy) -> (Subscription<T>, SubscriptionToken) {
        let id = SubscriptionId::next();
        let queue = Arc::new(DeliveryQueue::new(policy));

        let subscribers = {
            let mut registry = self.shared.lock();
            registry.queues.insert(id, Arc::clone(&queue));
            registry.queues.len()
        };
        tracing::debug!(
            subscription = %id,
            policy = ?queue.policy(),
            subscribers,
            "Subscriber registered"
        );

        let shared: Arc<dyn Unregister> = self.shared.clone();
        let registry = Arc::downgrade(&shared);
        let token = SubscriptionToken {
            id,
            registry: registry.clone(),
        };
        let subscription = Subscription {
            id,
            queue,
            registry,
        };
        (subscription, token)
    }

    /// Delivers `item` to every registered queue.
    ///
    /// Returns the number of subscribers that accepted the record. Closed and
    /// disconnected queues are pruned on the way.
    pub fn publish(&self, item: T) -> usize {
        let mut registry = self.shared.lock();
        let mut delivered = 0;
        registry.queues.retain(|id, queue| match queue.push(item.clone()) {
            Delivery::Queued => {
                delivered += 1;
                true
            }
            Delivery::DroppedOldest => {
                tracing::warn!(subscription = %id, "Subscriber queue full, dropped oldest record");
                delivered += 1;
                true
            }
            Delivery::DroppedNewest => {
                tracing::warn!(subscription = %id, "Subscriber queue full, dropped incoming record");
                true
            }
            Delivery::Disconnected => {
                tracing::warn!(subscription = %id, "Subscriber queue overflowed, disconnecting");
                false
            }
            Delivery::Closed => false,
        });
        delivered
    }

    /// Removes the queue behind `token`. Idempotent.
    pub fn unregister(&self, token: &SubscriptionToken) -> bool {
        self.shared.unregister(token.id)
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.shared.lock().queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + 'static> Default for BroadcastRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation handle for one subscription.
#[derive(Clone)]
pub struct SubscriptionToken {
    id: SubscriptionId,
    registry: Weak<dyn Unregister>,
}

impl SubscriptionToken {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unregisters the subscription. Returns false if it was already gone.
    pub fn cancel(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.unregister(self.id))
            .unwrap_or(false)
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionToken")
            .field("id", &self.id)
            .finish()
    }
}

/// Ordered stream of records delivered to one subscriber.
///
/// Dropping the subscription unregisters it from the registry.
pub struct Subscription<T> {
    id: SubscriptionId,
    queue: Arc<DeliveryQueue<T>>,
    registry: Weak<dyn Unregister>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next record. `None` once the subscription is closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        std::future::poll_fn(|cx| self.queue.poll_pop(cx)).await
    }

    /// Takes the next record if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.queue.try_pop()
    }

    /// Records queued but not yet received.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Records lost to this subscriber's overflow policy.
    pub fn lagged(&self) -> u64 {
        self.queue.lagged()
    }

    /// True once no further records will be delivered.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.queue.policy()
    }

    pub fn token(&self) -> SubscriptionToken {
        SubscriptionToken {
            id: self.id,
            registry: self.registry.clone(),
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.queue.poll_pop(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.queue.close();
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.queue.len())
            .field("lagged", &self.queue.lagged())
            .finish()
    }
}
