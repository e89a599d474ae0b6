use serde::{Deserialize, Serialize};

/// Default capacity of a bounded subscriber queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Queueing policy for one subscriber.
///
/// Every subscriber owns its own queue, so the policy only ever affects that
/// subscriber. Publishing never waits on a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Queue grows without limit. A stalled consumer grows memory unboundedly.
    Unbounded,
    /// Queue holds at most `capacity` records.
    Bounded {
        capacity: usize,
        #[serde(default)]
        overflow: OverflowPolicy,
    },
}

/// What a bounded queue does when a record arrives while it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued record to make room.
    #[default]
    DropOldest,
    /// Discard the incoming record.
    DropNewest,
    /// Close the queue and unregister the subscriber.
    Disconnect,
}

impl DeliveryPolicy {
    /// Bounded policy with the default overflow behavior.
    pub fn bounded(capacity: usize) -> Self {
        Self::Bounded {
            capacity,
            overflow: OverflowPolicy::default(),
        }
    }

    /// Maximum number of queued records, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Bounded { capacity, .. } => Some(*capacity),
        }
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::bounded(DEFAULT_QUEUE_CAPACITY)
    }
}
