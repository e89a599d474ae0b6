use super::dependency::{Dependency, DependencySelector};
use super::output::OutputSelector;

/// Cheap pre-check deciding whether a transition can affect a selector.
pub type Filter<S, A> = Box<dyn Fn(&S, &A) -> bool + Send + Sync>;

/// Outcome of feeding one transition to a [`Selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The filter rejected the transition; nothing was recomputed.
    Filtered,
    /// No dependency changed; the output was not recomputed.
    DependenciesUnchanged,
    /// The output was recomputed but compares equal to the cached one.
    OutputUnchanged,
    /// The cached output was replaced and observers should be notified.
    Changed,
}

impl Refresh {
    pub fn is_changed(self) -> bool {
        self == Refresh::Changed
    }
}

/// Memoized derivation of state `S` under actions `A`, producing `O`.
///
/// Uninitialized until the first [`prime`](Self::prime) or
/// [`observe`](Self::observe), which computes everything unconditionally.
/// Once primed, each transition runs the filter, then the dependencies, and
/// recomputes the output only when a dependency changed. A selector with no
/// dependencies recomputes its output on every transition that passes the
/// filter; leave dependencies out only when the output is cheap.
pub struct Selector<S, A, O> {
    filter: Option<Filter<S, A>>,
    dependencies: Vec<Box<dyn Dependency<S>>>,
    output: OutputSelector<S, O>,
    cached: Option<O>,
}

impl<S: 'static, A: 'static, O> Selector<S, A, O> {
    pub fn new(output: OutputSelector<S, O>) -> Self {
        Self {
            filter: None,
            dependencies: Vec::new(),
            output,
            cached: None,
        }
    }

    /// Skips transitions for which `filter(current_state, action)` is false.
    pub fn with_filter(mut self, filter: impl Fn(&S, &A) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn depends_on<D: Send + 'static>(mut self, dependency: DependencySelector<S, D>) -> Self {
        self.dependencies.push(Box::new(dependency));
        self
    }

    pub fn is_primed(&self) -> bool {
        self.cached.is_some()
    }

    /// Cached output, if primed.
    pub fn output(&self) -> Option<&O> {
        self.cached.as_ref()
    }

    /// Computes dependencies and output unconditionally.
    pub fn prime(&mut self, state: &S) -> &O {
        for dependency in &mut self.dependencies {
            dependency.prime(state);
        }
        let output = self.output.extract(state);
        self.cached.insert(output)
    }

    /// Cached output, priming first if needed.
    pub fn current(&mut self, state: &S) -> &O {
        if self.cached.is_none() {
            for dependency in &mut self.dependencies {
                dependency.prime(state);
            }
        }
        let output = &self.output;
        self.cached.get_or_insert_with(|| output.extract(state))
    }

    /// Advances the selector by one transition, given the current state.
    pub fn observe(&mut self, state: &S, action: &A) -> Refresh {
        if !self.is_primed() {
            self.prime(state);
            return Refresh::Changed;
        }

        if let Some(filter) = &self.filter {
            if !filter(state, action) {
                return Refresh::Filtered;
            }
        }

        if !self.dependencies.is_empty() {
            // Every dependency is refreshed so all caches track this state.
            let mut changed = false;
            for dependency in &mut self.dependencies {
                changed |= dependency.refresh(state);
            }
            if !changed {
                return Refresh::DependenciesUnchanged;
            }
        }

        let next = self.output.extract(state);
        let unchanged =
            matches!(&self.cached, Some(previous) if !self.output.changed(previous, &next));
        if unchanged {
            return Refresh::OutputUnchanged;
        }
        self.cached = Some(next);
        Refresh::Changed
    }

    /// Re-derives everything from `state`, skipping the filter.
    ///
    /// Used after transitions were lost: a filtered-out record can no longer
    /// be told apart from a missing one. Observers are only notified if the
    /// output actually differs from the cached one.
    pub fn resync(&mut self, state: &S) -> Refresh {
        for dependency in &mut self.dependencies {
            dependency.prime(state);
        }
        let next = self.output.extract(state);
        let unchanged =
            matches!(&self.cached, Some(previous) if !self.output.changed(previous, &next));
        if unchanged {
            return Refresh::OutputUnchanged;
        }
        self.cached = Some(next);
        Refresh::Changed
    }

    /// Drops every cached value and returns to the uninitialized state.
    pub fn reset(&mut self) {
        self.cached = None;
        for dependency in &mut self.dependencies {
            dependency.reset();
        }
    }
}
