//! Dependency selectors decide whether the output needs recomputing.

type Extract<S, D> = Box<dyn Fn(&S) -> D + Send + Sync>;
type Changed<D> = Box<dyn Fn(&D, &D) -> bool + Send + Sync>;

/// Type-erased dependency held by a [`Selector`](super::Selector).
///
/// Each dependency caches its own last accepted value.
pub trait Dependency<S>: Send {
    /// Extracts and caches the value unconditionally.
    fn prime(&mut self, state: &S);

    /// Extracts the value and reports whether it changed since the cached one.
    ///
    /// The cache is only replaced when a change is reported, so predicates
    /// with a tolerance compare against the last accepted value.
    fn refresh(&mut self, state: &S) -> bool;

    fn reset(&mut self);
}

/// `(extract, changed)` pair extracting a value of type `D` from state `S`.
pub struct DependencySelector<S, D> {
    extract: Extract<S, D>,
    changed: Changed<D>,
    cached: Option<D>,
}

impl<S, D> DependencySelector<S, D> {
    pub fn new(
        extract: impl Fn(&S) -> D + Send + Sync + 'static,
        changed: impl Fn(&D, &D) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            extract: Box::new(extract),
            changed: Box::new(changed),
            cached: None,
        }
    }

    /// Last accepted value, if primed.
    pub fn cached(&self) -> Option<&D> {
        self.cached.as_ref()
    }
}

impl<S, D: PartialEq> DependencySelector<S, D> {
    /// Dependency whose change predicate is `!=`.
    pub fn distinct(extract: impl Fn(&S) -> D + Send + Sync + 'static) -> Self {
        Self::new(extract, |previous, next| previous != next)
    }
}

impl<S, D: Send> Dependency<S> for DependencySelector<S, D> {
    fn prime(&mut self, state: &S) {
        self.cached = Some((self.extract)(state));
    }

    fn refresh(&mut self, state: &S) -> bool {
        let next = (self.extract)(state);
        let unchanged = matches!(&self.cached, Some(previous) if !(self.changed)(previous, &next));
        if unchanged {
            return false;
        }
        self.cached = Some(next);
        true
    }

    fn reset(&mut self) {
        self.cached = None;
    }
}
