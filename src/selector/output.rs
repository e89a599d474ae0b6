type Extract<S, O> = Box<dyn Fn(&S) -> O + Send + Sync>;
type Changed<O> = Box<dyn Fn(&O, &O) -> bool + Send + Sync>;

/// `(extract, changed)` pair producing the value delivered to consumers.
pub struct OutputSelector<S, O> {
    extract: Extract<S, O>,
    changed: Changed<O>,
}

impl<S, O> OutputSelector<S, O> {
    pub fn new(
        extract: impl Fn(&S) -> O + Send + Sync + 'static,
        changed: impl Fn(&O, &O) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            extract: Box::new(extract),
            changed: Box::new(changed),
        }
    }

    pub(crate) fn extract(&self, state: &S) -> O {
        (self.extract)(state)
    }

    pub(crate) fn changed(&self, previous: &O, next: &O) -> bool {
        (self.changed)(previous, next)
    }
}

impl<S, O: PartialEq> OutputSelector<S, O> {
    /// Output whose change predicate is `!=`.
    pub fn distinct(extract: impl Fn(&S) -> O + Send + Sync + 'static) -> Self {
        Self::new(extract, |previous, next| previous != next)
    }
}
