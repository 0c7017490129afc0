//! Guard predicates for controlling state transitions.
//!
//! Guards are boolean functions over the payload a transition carries. A
//! transition is accepted only when every guard on the transition and every
//! guard on its destination state returns `true`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Predicate that determines if a transition carrying `D` may be applied.
///
/// Simple transitions carry `()`, so their guards ignore the argument.
///
/// # Example
///
/// ```rust
/// use nestate::core::Guard;
///
/// let small = Guard::new(|n: &u32| *n < 10);
///
/// assert!(small.check(&3));
/// assert!(!small.check(&42));
/// ```
pub struct Guard<D> {
    predicate: Rc<dyn Fn(&D) -> bool>,
}

impl<D> Guard<D> {
    /// Create a guard from a predicate.
    ///
    /// Predicates are expected to be free of side effects: evaluation stops
    /// at the first guard that returns `false`.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&D) -> bool + 'static,
    {
        Guard {
            predicate: Rc::new(predicate),
        }
    }

    /// Check if the guard allows a transition carrying `data`.
    pub fn check(&self, data: &D) -> bool {
        (self.predicate)(data)
    }
}

impl<D> Clone for Guard<D> {
    fn clone(&self) -> Self {
        Self {
            predicate: Rc::clone(&self.predicate),
        }
    }
}

impl<D> fmt::Debug for Guard<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}

/// Ordered, append-only list of guards.
///
/// Guards may be added at any time, including from inside another guard or
/// a notification callback. Evaluation works on a snapshot of the list, so
/// guards added mid-evaluation only affect later attempts.
pub struct GuardSet<D> {
    guards: RefCell<Vec<Guard<D>>>,
}

impl<D> GuardSet<D> {
    pub fn new() -> Self {
        Self {
            guards: RefCell::new(Vec::new()),
        }
    }

    pub fn push(&self, guard: Guard<D>) {
        self.guards.borrow_mut().push(guard);
    }

    pub fn len(&self) -> usize {
        self.guards.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.borrow().is_empty()
    }

    /// Index of the first guard, in declaration order, that rejects `data`.
    pub fn first_rejection(&self, data: &D) -> Option<usize> {
        let guards = self.guards.borrow().clone();
        guards.iter().position(|guard| !guard.check(data))
    }

    /// Whether every guard accepts `data`. An empty set accepts everything.
    pub fn allows(&self, data: &D) -> bool {
        self.first_rejection(data).is_none()
    }
}

impl<D> Default for GuardSet<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for GuardSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardSet")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn guard_checks_payload() {
        let guard = Guard::new(|s: &String| s.starts_with('#'));

        assert!(guard.check(&"#fff".to_string()));
        assert!(!guard.check(&"fff".to_string()));
    }

    #[test]
    fn unit_guard_ignores_argument() {
        let enabled = Rc::new(Cell::new(false));
        let flag = Rc::clone(&enabled);
        let guard = Guard::new(move |_: &()| flag.get());

        assert!(!guard.check(&()));
        enabled.set(true);
        assert!(guard.check(&()));
    }

    #[test]
    fn empty_set_allows_everything() {
        let set: GuardSet<u8> = GuardSet::new();

        assert!(set.is_empty());
        assert!(set.allows(&0));
    }

    #[test]
    fn first_rejection_follows_declaration_order() {
        let set = GuardSet::new();
        set.push(Guard::new(|n: &i32| *n > 0));
        set.push(Guard::new(|n: &i32| *n < 100));
        set.push(Guard::new(|n: &i32| n % 2 == 0));

        assert_eq!(set.first_rejection(&4), None);
        assert_eq!(set.first_rejection(&-4), Some(0));
        assert_eq!(set.first_rejection(&200), Some(1));
        assert_eq!(set.first_rejection(&5), Some(2));
    }

    #[test]
    fn evaluation_stops_at_first_rejection() {
        let calls = Rc::new(Cell::new(0));
        let set = GuardSet::new();
        set.push(Guard::new(|_: &()| false));
        let counter = Rc::clone(&calls);
        set.push(Guard::new(move |_: &()| {
            counter.set(counter.get() + 1);
            true
        }));

        assert!(!set.allows(&()));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn guard_may_extend_its_own_set() {
        let set: Rc<GuardSet<()>> = Rc::new(GuardSet::new());
        let inner = Rc::clone(&set);
        set.push(Guard::new(move |_: &()| {
            inner.push(Guard::new(|_: &()| false));
            true
        }));

        assert!(set.allows(&()));
        assert_eq!(set.len(), 2);
        assert!(!set.allows(&()));
    }
}
