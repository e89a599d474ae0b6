use serde::{Deserialize, Serialize};

use crate::broadcast::DeliveryPolicy;

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Name attached to every log event emitted by the store.
    #[serde(default = "default_name")]
    pub name: String,
    /// Emit a debug event per accepted transition (default: true).
    #[serde(default = "default_trace_transitions")]
    pub trace_transitions: bool,
    /// Queue policy for subscribers that don't pick their own.
    #[serde(default)]
    pub delivery: DeliveryPolicy,
    /// Queue policy for listeners (default: unbounded).
    ///
    /// A listener that loses a record can miss the transition that should
    /// have started a side effect, so listeners default to a lossless queue.
    #[serde(default = "default_listener_delivery")]
    pub listener_delivery: DeliveryPolicy,
}

fn default_name() -> String {
    "store".to_string()
}

fn default_trace_transitions() -> bool {
    true
}

fn default_listener_delivery() -> DeliveryPolicy {
    DeliveryPolicy::Unbounded
}

impl StoreConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryPolicy) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_listener_delivery(mut self, delivery: DeliveryPolicy) -> Self {
        self.listener_delivery = delivery;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            trace_transitions: default_trace_transitions(),
            delivery: DeliveryPolicy::default(),
            listener_delivery: default_listener_delivery(),
        }
    }
}
