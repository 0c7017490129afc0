//! Declared transitions and the acceptance algorithm.

use super::machine::{Machine, MachineCore};
use super::state::State;
use crate::core::{Guard, GuardSet, Source};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// What happened to one transition attempt.
///
/// Only [`Outcome::Applied`] changes the machine. The other variants tell
/// apart the ways an attempt can be turned away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The state change was carried out.
    Applied,
    /// The machine was not running; the attempt waits for the next start.
    Queued,
    /// The machine was not running and does not queue, or it was disposed.
    Discarded,
    /// The current state is not among the transition's sources.
    Inapplicable,
    /// A transition or destination guard returned `false`.
    GuardRejected,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

struct TransitionInner<D> {
    name: String,
    source: Source,
    destination: State<D>,
    machine: Weak<MachineCore>,
    guards: GuardSet<D>,
}

/// A guarded edge from a set of source states to one destination.
///
/// `Transition<()>` is a simple transition, fired with [`Transition::fire`].
/// A transition into a `State<D>` carries a `D` payload and is fired with
/// [`Transition::fire_with`].
pub struct Transition<D = ()> {
    inner: Rc<TransitionInner<D>>,
}

impl<D: Clone + 'static> Transition<D> {
    pub(crate) fn new(
        name: impl Into<String>,
        source: Source,
        destination: State<D>,
        machine: Weak<MachineCore>,
    ) -> Self {
        Self {
            inner: Rc::new(TransitionInner {
                name: name.into(),
                source,
                destination,
                machine,
                guards: GuardSet::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn source(&self) -> &Source {
        &self.inner.source
    }

    pub fn destination(&self) -> &State<D> {
        &self.inner.destination
    }

    /// Append a guard. Affects only attempts made after this call.
    pub fn guard<F>(&self, predicate: F) -> &Self
    where
        F: Fn(&D) -> bool + 'static,
    {
        self.inner.guards.push(Guard::new(predicate));
        self
    }

    /// Attempt the transition, returning `true` iff it was applied.
    pub fn fire_with(&self, data: D) -> bool {
        self.attempt(data).is_applied()
    }

    /// Attempt the transition and report exactly how it was handled.
    ///
    /// While the machine is not running the attempt is queued or
    /// discarded without evaluating any guard. Otherwise the current state
    /// must be one of the sources, then every transition guard and every
    /// destination guard must accept `data`, in declaration order.
    pub fn attempt(&self, data: D) -> Outcome {
        let Some(core) = self.inner.machine.upgrade() else {
            return Outcome::Discarded;
        };
        let machine = Machine::from_core(core);

        if !machine.is_running() {
            if !machine.queues() || machine.is_disposed() {
                trace!(machine = %machine.name(), transition = %self.name(), "attempt discarded");
                return Outcome::Discarded;
            }
            let transition = self.clone();
            machine.enqueue(self.name(), Box::new(move || transition.attempt(data)));
            trace!(machine = %machine.name(), transition = %self.name(), "attempt queued");
            return Outcome::Queued;
        }

        let current = machine.current();
        if !self.inner.source.admits(&current) {
            trace!(
                machine = %machine.name(),
                transition = %self.name(),
                from = %current,
                "transition not applicable"
            );
            return Outcome::Inapplicable;
        }

        let destination = &self.inner.destination;
        if !self.inner.guards.allows(&data) || !destination.inner.guards.allows(&data) {
            trace!(
                machine = %machine.name(),
                transition = %self.name(),
                from = %current,
                to = %destination.name(),
                "guard rejected transition"
            );
            return Outcome::GuardRejected;
        }

        machine.change_to(destination, data, Some(self.name()));
        Outcome::Applied
    }
}

impl Transition<()> {
    /// Attempt a simple transition, returning `true` iff it was applied.
    pub fn fire(&self) -> bool {
        self.fire_with(())
    }
}

impl<D> Clone for Transition<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D> fmt::Debug for Transition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.inner.name)
            .field("source", &self.inner.source.to_string())
            .field("destination", &self.inner.destination.inner.key_name())
            .field("guards", &self.inner.guards.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn switch() -> (Machine, State, State, Transition, Transition) {
        let machine = Machine::new("switch");
        let off = machine.state("off").unwrap();
        let on = machine.state("on").unwrap();
        let turn_on = machine.transition("turnOn", &off, &on).unwrap();
        let turn_off = machine.transition("turnOff", &on, &off).unwrap();
        machine.initialize(&off).unwrap();
        (machine, off, on, turn_on, turn_off)
    }

    #[test]
    fn attempt_before_start_is_discarded_without_queue() {
        let (machine, off, _on, turn_on, _) = switch();

        assert_eq!(turn_on.attempt(()), Outcome::Discarded);
        machine.start().unwrap();
        assert!(off.is_active());
    }

    #[test]
    fn inapplicable_source_is_reported() {
        let (machine, off, _on, _, turn_off) = switch();
        machine.start().unwrap();

        assert_eq!(turn_off.attempt(()), Outcome::Inapplicable);
        assert!(off.is_active());
    }

    #[test]
    fn guards_are_not_consulted_when_inapplicable() {
        let (machine, _off, _on, _, turn_off) = switch();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        turn_off.guard(move |_| {
            counter.set(counter.get() + 1);
            true
        });
        machine.start().unwrap();

        assert!(!turn_off.fire());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn destination_guard_blocks_transition() {
        let (machine, off, on, turn_on, _) = switch();
        on.guard(|_| false);
        machine.start().unwrap();

        assert_eq!(turn_on.attempt(()), Outcome::GuardRejected);
        assert!(off.is_active());
    }

    #[test]
    fn typed_guard_sees_payload() {
        let machine = Machine::new("dimmer");
        let off = machine.state("off").unwrap();
        let lit = machine.pstate::<u8>("lit").unwrap();
        let set = machine.ptransition("set", Source::Any, &lit).unwrap();
        set.guard(|level| *level > 0);
        lit.guard(|level| *level <= 100);
        machine.initialize(&off).unwrap();
        machine.start().unwrap();

        assert_eq!(set.attempt(0), Outcome::GuardRejected);
        assert_eq!(set.attempt(150), Outcome::GuardRejected);
        assert_eq!(set.attempt(40), Outcome::Applied);
        assert_eq!(lit.data(), Ok(40));
        assert_eq!(set.attempt(60), Outcome::Applied);
        assert_eq!(lit.data(), Ok(60));
    }

    #[test]
    fn transition_outliving_machine_is_discarded() {
        let (machine, _off, _on, turn_on, _) = switch();
        drop(machine);

        assert_eq!(turn_on.attempt(()), Outcome::Discarded);
    }

    #[test]
    fn outcome_only_applied_counts() {
        assert!(Outcome::Applied.is_applied());
        for outcome in [
            Outcome::Queued,
            Outcome::Discarded,
            Outcome::Inapplicable,
            Outcome::GuardRejected,
        ] {
            assert!(!outcome.is_applied());
        }
    }
}
