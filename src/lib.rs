//! Unidirectional data flow engine.
//!
//! A [`Store`] owns one immutable state snapshot and replaces it only through a
//! pure [`Reducer`]. Every accepted transition is broadcast to independent
//! subscribers: memoized [`Selector`]s that feed presentation, and
//! [`Listener`]s that orchestrate side effects by dispatching thunks.

pub mod apps;
pub mod broadcast;
pub mod config;
pub mod flow;
pub mod lifecycle;
pub mod listener;
pub mod logging;
pub mod selector;
pub mod store;

pub use broadcast::{DeliveryPolicy, OverflowPolicy, Subscription, SubscriptionToken};
pub use config::StoreConfig;
pub use flow::{Action, Reducer, State};
pub use listener::{spawn_listener, spawn_listener_with, Listener, ListenerHandle};
pub use selector::{
    spawn_selection, spawn_selection_with, DependencySelector, KeyedSelector, OutputSelector,
    Refresh, Selection, Selector,
};
pub use store::{Store, Transition, WeakStore};
