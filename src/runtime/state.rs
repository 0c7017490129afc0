//! Declared states.

use super::error::InactiveState;
use super::machine::{Machine, MachineCore};
use crate::builder::MachineConfig;
use crate::core::{Guard, GuardSet, StateId, StateKey};
use crate::signal::{Channel, Subscription};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Type-erased view of a state, used by its machine.
pub(crate) trait StateNode {
    fn key(&self) -> &StateKey;

    fn submachines(&self) -> Vec<Machine>;

    /// Stop nested machines, drop the payload, then notify exit listeners.
    /// Does nothing if an exit of this state is already in progress. Exit
    /// listeners are only notified if enter listeners were notified for the
    /// same stay; a state whose entry was superseded is left silently.
    fn exit(&self);

    fn dispose(&self);
}

pub(crate) struct StateInner<D> {
    key: StateKey,
    machine: Weak<MachineCore>,
    data: RefCell<Option<D>>,
    pub(crate) guards: GuardSet<D>,
    submachines: RefCell<Vec<Machine>>,
    entered: Channel<D>,
    exited: Channel<()>,
    exiting: Cell<bool>,
    occupied: Cell<bool>,
}

impl<D> StateInner<D> {
    pub(crate) fn key_name(&self) -> &str {
        self.key.name()
    }

    fn is_current(&self) -> bool {
        self.machine
            .upgrade()
            .is_some_and(|core| core.is_current(&self.key))
    }
}

impl<D: Clone + 'static> StateInner<D> {
    /// Store the payload, notify enter listeners, then start nested
    /// machines.
    pub(crate) fn enter(&self, data: D) {
        *self.data.borrow_mut() = Some(data.clone());
        self.occupied.set(true);
        self.entered.emit(&data);
        if !self.is_current() {
            return;
        }
        for machine in self.submachines() {
            machine.start_nested();
        }
    }
}

impl<D: Clone + 'static> StateNode for StateInner<D> {
    fn key(&self) -> &StateKey {
        &self.key
    }

    fn submachines(&self) -> Vec<Machine> {
        self.submachines.borrow().clone()
    }

    fn exit(&self) {
        // An exit listener may trigger another change out of this state.
        if self.exiting.replace(true) {
            return;
        }
        let occupied = self.occupied.replace(false);
        for machine in self.submachines() {
            machine.halt();
        }
        self.data.borrow_mut().take();
        if occupied {
            self.exited.emit(&());
        }
        self.exiting.set(false);
    }

    fn dispose(&self) {
        self.occupied.set(false);
        self.entered.close();
        self.exited.close();
        self.data.borrow_mut().take();
        let nested = std::mem::take(&mut *self.submachines.borrow_mut());
        for machine in nested {
            machine.teardown();
        }
    }
}

/// A state declared on a [`Machine`].
///
/// Simple states are `State<()>`; parameterized states carry a payload of
/// type `D` for as long as they are current. Handles are cheap to clone and
/// all clones refer to the same state.
pub struct State<D = ()> {
    pub(crate) inner: Rc<StateInner<D>>,
}

impl<D: Clone + 'static> State<D> {
    pub(crate) fn new(name: impl Into<String>, machine: Weak<MachineCore>) -> Self {
        Self {
            inner: Rc::new(StateInner {
                key: StateKey::new(name),
                machine,
                data: RefCell::new(None),
                guards: GuardSet::new(),
                submachines: RefCell::new(Vec::new()),
                entered: Channel::new(),
                exited: Channel::new(),
                exiting: Cell::new(false),
                occupied: Cell::new(false),
            }),
        }
    }

    pub(crate) fn node(&self) -> Rc<dyn StateNode> {
        self.inner.clone()
    }

    pub fn key(&self) -> StateKey {
        self.inner.key.clone()
    }

    pub fn id(&self) -> StateId {
        self.inner.key.id()
    }

    pub fn name(&self) -> &str {
        self.inner.key.name()
    }

    /// Whether this state is its machine's current state.
    pub fn is_active(&self) -> bool {
        self.inner.is_current()
    }

    /// Payload this state was entered with.
    ///
    /// Fails with [`InactiveState`] unless the state is current; check
    /// [`State::is_active`] first when the call order is not fixed.
    pub fn data(&self) -> Result<D, InactiveState> {
        let inactive = || InactiveState {
            state: self.name().to_string(),
        };
        if !self.is_active() {
            return Err(inactive());
        }
        self.inner.data.borrow().clone().ok_or_else(inactive)
    }

    /// Append a guard evaluated for every transition entering this state.
    pub fn guard<F>(&self, predicate: F) -> &Self
    where
        F: Fn(&D) -> bool + 'static,
    {
        self.inner.guards.push(Guard::new(predicate));
        self
    }

    /// Called with the payload each time this state is entered.
    pub fn on_enter<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&D) + 'static,
    {
        self.inner.entered.subscribe(callback)
    }

    /// Called each time this state is exited.
    pub fn on_exit<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.inner.exited.subscribe(move |_| callback())
    }

    /// Create a child machine that runs while this state is current.
    ///
    /// The child must be initialized before this state is next entered. A
    /// child nested under a state that is already current waits until the
    /// state is entered again.
    pub fn nest(&self, name: impl Into<String>) -> Machine {
        self.nest_with(MachineConfig::new(name))
    }

    /// Like [`State::nest`] with a full configuration.
    pub fn nest_with(&self, config: MachineConfig) -> Machine {
        let machine = Machine::nested(config);
        self.inner.submachines.borrow_mut().push(machine.clone());
        machine
    }

    pub fn submachines(&self) -> Vec<Machine> {
        self.inner.submachines.borrow().clone()
    }
}

impl<D> Clone for State<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D> PartialEq for State<D> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.key == other.inner.key
    }
}

impl<D> Eq for State<D> {}

impl<D> fmt::Debug for State<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.inner.key.name())
            .field("id", &self.inner.key.id())
            .finish()
    }
}

impl<D> fmt::Display for State<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.key.name())
    }
}

impl<D> From<&State<D>> for crate::core::Source {
    fn from(state: &State<D>) -> Self {
        Self::States(vec![state.inner.key.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_inactive() {
        let machine = Machine::new("m");
        let idle = machine.state("idle").unwrap();

        assert!(!idle.is_active());
        assert_eq!(
            idle.data(),
            Err(InactiveState {
                state: "idle".to_string()
            })
        );
    }

    #[test]
    fn payload_is_scoped_to_activity() {
        let machine = Machine::new("m");
        let idle = machine.state("idle").unwrap();
        let busy = machine.pstate::<u32>("busy").unwrap();
        let work = machine.ptransition("work", &idle, &busy).unwrap();
        let rest = machine.transition("rest", &busy, &idle).unwrap();
        machine.initialize(&idle).unwrap();
        machine.start().unwrap();

        assert!(busy.data().is_err());
        assert!(work.fire_with(7));
        assert_eq!(busy.data(), Ok(7));
        assert!(rest.fire());
        assert!(busy.data().is_err());
    }

    #[test]
    fn enter_and_exit_listeners_fire() {
        let machine = Machine::new("m");
        let a = machine.state("a").unwrap();
        let b = machine.pstate::<String>("b").unwrap();
        let go = machine.ptransition("go", &a, &b).unwrap();

        let exits = Rc::new(Cell::new(0));
        let entered = Rc::new(RefCell::new(Vec::new()));
        let counter = Rc::clone(&exits);
        let _ = a.on_exit(move || counter.set(counter.get() + 1));
        let sink = Rc::clone(&entered);
        let _ = b.on_enter(move |name: &String| sink.borrow_mut().push(name.clone()));

        machine.initialize(&a).unwrap();
        machine.start().unwrap();
        assert!(go.fire_with("hello".to_string()));

        assert_eq!(exits.get(), 1);
        assert_eq!(*entered.borrow(), vec!["hello".to_string()]);
    }

    #[test]
    fn states_with_equal_names_are_distinct() {
        let machine = Machine::new("m");
        let first = machine.state("dup").unwrap();
        let second = machine.state("dup").unwrap();

        assert_ne!(first, second);
        assert_eq!(first, first.clone());
    }

    #[test]
    fn nest_records_child_machine() {
        let machine = Machine::new("m");
        let on = machine.state("on").unwrap();
        let color = on.nest("color");

        assert_eq!(on.submachines().len(), 1);
        assert_eq!(color.name(), "color");
        assert!(color.is_nested());
    }
}
