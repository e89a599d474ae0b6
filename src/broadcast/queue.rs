//! Per-subscriber delivery queue.

use std::collections::VecDeque;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use super::policy::{DeliveryPolicy, OverflowPolicy};

/// Result of pushing one record into a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Queued,
    /// Record queued after evicting the oldest one.
    DroppedOldest,
    /// Record discarded because the queue was full.
    DroppedNewest,
    /// Queue overflowed and is now closed.
    Disconnected,
    /// Queue was already closed.
    Closed,
}

pub(crate) struct DeliveryQueue<T> {
    policy: DeliveryPolicy,
    inner: Mutex<QueueInner<T>>,
}

struct QueueInner<T> {
    items: VecDeque<T>,
    waker: Option<Waker>,
    closed: bool,
    lagged: u64,
}

impl<T> DeliveryQueue<T> {
    pub(crate) fn new(policy: DeliveryPolicy) -> Self {
        let initial = policy.capacity().map(|c| c.min(64)).unwrap_or(16);
        Self {
            policy,
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(initial),
                waker: None,
                closed: false,
                lagged: 0,
            }),
        }
    }

    pub(crate) fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    pub(crate) fn push(&self, item: T) -> Delivery {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Delivery::Closed;
        }

        let mut outcome = Delivery::Queued;
        if let DeliveryPolicy::Bounded { capacity, overflow } = self.policy {
            if inner.items.len() >= capacity {
                match overflow {
                    OverflowPolicy::DropOldest => {
                        inner.items.pop_front();
                        inner.lagged += 1;
                        outcome = Delivery::DroppedOldest;
                    }
                    OverflowPolicy::DropNewest => {
                        inner.lagged += 1;
                        return Delivery::DroppedNewest;
                    }
                    OverflowPolicy::Disconnect => {
                        inner.closed = true;
                        let waker = inner.waker.take();
                        drop(inner);
                        if let Some(waker) = waker {
                            waker.wake();
                        }
                        return Delivery::Disconnected;
                    }
                }
            }
        }

        // A zero-capacity DropOldest queue has nothing to evict.
        if self.policy.capacity() == Some(0) {
            return outcome;
        }

        inner.items.push_back(item);
        let waker = inner.waker.take();
        drop(inner);
        if let Some(waker) = waker {
            waker.wake();
        }
        outcome
    }

    /// Pops the next record, registering the waker when the queue is empty.
    ///
    /// Buffered records are still handed out after the queue is closed.
    pub(crate) fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut inner = self.inner.lock();
        if let Some(item) = inner.items.pop_front() {
            return Poll::Ready(Some(item));
        }
        if inner.closed {
            return Poll::Ready(None);
        }
        match &inner.waker {
            Some(existing) if existing.will_wake(cx.waker()) => {}
            _ => inner.waker = Some(cx.waker().clone()),
        }
        Poll::Pending
    }

    pub(crate) fn try_pop(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let waker = inner.waker.take();
        drop(inner);
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub(crate) fn lagged(&self) -> u64 {
        self.inner.lock().lagged
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().items.len()
    }
}
