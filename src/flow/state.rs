//! Base trait for application state.

/// Marker trait for state snapshots.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Self-contained (all data needed by consumers)
/// - Comparable (PartialEq for detecting changes)
pub trait State: Clone + PartialEq + Send + Sync + 'static {}
