//! Base trait for actions.

use std::fmt::Debug;

/// Marker trait for action values.
///
/// Actions describe what happened, never what to do:
/// - User events (a list appeared, a form was submitted)
/// - System events (timers, lifecycle)
/// - Data source events (a fetch completed or failed)
///
/// Actions are processed by reducers to produce new states.
pub trait Action: Clone + Debug + Send + Sync + 'static {}
