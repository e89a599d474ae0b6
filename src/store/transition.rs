use std::fmt;
use std::sync::Arc;

/// Record of one accepted dispatch: the state before it and the action applied.
///
/// The resulting state is not carried; subscribers read it back from the
/// store when they need it. Cloning is cheap.
pub struct Transition<S, A> {
    old: Arc<S>,
    action: Arc<A>,
    sequence: u64,
}

impl<S, A> Transition<S, A> {
    pub(crate) fn new(old: Arc<S>, action: A, sequence: u64) -> Self {
        Self {
            old,
            action: Arc::new(action),
            sequence,
        }
    }

    /// State the action was applied to.
    pub fn old_state(&self) -> &S {
        &self.old
    }

    pub fn old_snapshot(&self) -> Arc<S> {
        Arc::clone(&self.old)
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    /// 1-based position of this transition in the store's history.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl<S, A> Clone for Transition<S, A> {
    fn clone(&self) -> Self {
        Self {
            old: Arc::clone(&self.old),
            action: Arc::clone(&self.action),
            sequence: self.sequence,
        }
    }
}

impl<S: fmt::Debug, A: fmt::Debug> fmt::Debug for Transition<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("sequence", &self.sequence)
            .field("old", &self.old)
            .field("action", &self.action)
            .finish()
    }
}
