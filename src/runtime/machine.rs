//! Machine lifecycle and the state-change protocol.

use super::error::MachineError;
use super::state::{State, StateNode};
use super::transition::{Outcome, Transition};
use crate::builder::{MachineBuilder, MachineConfig};
use crate::core::{Current, Source, StateHistory, StateKey, TransitionRecord, TERMINAL_NAME};
use crate::signal::{Channel, Subscription};
use crate::validation;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Diagnostic identity of a machine. Names need not be unique; ids are.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineId(Uuid);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle phase of a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No initial state assigned yet
    Uninitialized,
    /// Initial state assigned, never started
    Initialized,
    /// Some declared state is current
    Running,
    /// Ran at least once, now back at the terminal position
    Stopped,
    /// Resources released; nothing further can happen
    Disposed,
}

type InitialEntry = Rc<dyn Fn(&Machine)>;

struct PendingAttempt {
    transition: String,
    replay: Box<dyn FnOnce() -> Outcome>,
}

pub(crate) struct MachineCore {
    id: MachineId,
    config: MachineConfig,
    nested: bool,
    initial: RefCell<Option<(StateKey, InitialEntry)>>,
    current: RefCell<Option<Rc<dyn StateNode>>>,
    started: Cell<bool>,
    disposed: Cell<bool>,
    changes: Cell<u64>,
    pending: RefCell<VecDeque<PendingAttempt>>,
    states: RefCell<Vec<Rc<dyn StateNode>>>,
    changed: Channel<Current>,
    history: RefCell<StateHistory>,
}

impl MachineCore {
    pub(crate) fn is_current(&self, key: &StateKey) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|node| node.key() == key)
    }
}

/// A hierarchical state machine.
///
/// A `Machine` is a handle; clones share the same machine. Machines are
/// single-threaded: every operation, including every notification it
/// triggers, runs to completion on the calling thread. Callbacks may fire
/// transitions re-entrantly; a nested change completes before the outer one
/// resumes.
///
/// # Example
///
/// ```rust
/// use nestate::Machine;
///
/// let switch = Machine::new("switch");
/// let off = switch.state("off")?;
/// let on = switch.state("on")?;
/// let turn_on = switch.transition("turnOn", &off, &on)?;
/// let turn_off = switch.transition("turnOff", &on, &off)?;
///
/// switch.initialize(&off)?;
/// switch.start()?;
///
/// assert!(!turn_off.fire());
/// assert!(turn_on.fire());
/// assert!(on.is_active());
/// assert_eq!(switch.to_string(), "on");
/// # Ok::<(), nestate::MachineError>(())
/// ```
pub struct Machine {
    core: Rc<MachineCore>,
}

impl Machine {
    /// Create a root machine that discards attempts made before start.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(MachineConfig::new(name))
    }

    pub fn builder(name: impl Into<String>) -> MachineBuilder {
        MachineBuilder::new(name)
    }

    pub fn from_config(config: MachineConfig) -> Self {
        Self::with_config(config, false)
    }

    pub(crate) fn nested(config: MachineConfig) -> Self {
        Self::with_config(config, true)
    }

    fn with_config(config: MachineConfig, nested: bool) -> Self {
        let history = StateHistory::with_limit(config.history_limit);
        Self {
            core: Rc::new(MachineCore {
                id: MachineId(Uuid::new_v4()),
                config,
                nested,
                initial: RefCell::new(None),
                current: RefCell::new(None),
                started: Cell::new(false),
                disposed: Cell::new(false),
                changes: Cell::new(0),
                pending: RefCell::new(VecDeque::new()),
                states: RefCell::new(Vec::new()),
                changed: Channel::new(),
                history: RefCell::new(history),
            }),
        }
    }

    pub(crate) fn from_core(core: Rc<MachineCore>) -> Self {
        Self { core }
    }

    pub fn id(&self) -> MachineId {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.config.name
    }

    pub fn config(&self) -> &MachineConfig {
        &self.core.config
    }

    /// Whether attempts made while not running are kept for the next start.
    pub fn queues(&self) -> bool {
        self.core.config.queue
    }

    /// Whether this machine is owned by a state of another machine.
    pub fn is_nested(&self) -> bool {
        self.core.nested
    }

    pub fn is_running(&self) -> bool {
        self.core.current.borrow().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.core.disposed.get()
    }

    pub fn phase(&self) -> Phase {
        if self.is_disposed() {
            Phase::Disposed
        } else if self.is_running() {
            Phase::Running
        } else if self.core.started.get() {
            Phase::Stopped
        } else if self.core.initial.borrow().is_some() {
            Phase::Initialized
        } else {
            Phase::Uninitialized
        }
    }

    pub fn current(&self) -> Current {
        match self.current_node() {
            Some(node) => Current::State(node.key().clone()),
            None => Current::Terminal,
        }
    }

    /// Keys of every state declared on this machine, in declaration order.
    pub fn states(&self) -> Vec<StateKey> {
        self.core
            .states
            .borrow()
            .iter()
            .map(|node| node.key().clone())
            .collect()
    }

    pub fn owns(&self, key: &StateKey) -> bool {
        self.core
            .states
            .borrow()
            .iter()
            .any(|node| node.key() == key)
    }

    /// Number of attempts waiting for the next start.
    pub fn pending(&self) -> usize {
        self.core.pending.borrow().len()
    }

    pub fn history(&self) -> StateHistory {
        self.core.history.borrow().clone()
    }

    /// Declare a simple state.
    pub fn state(&self, name: impl Into<String>) -> Result<State, MachineError> {
        self.pstate::<()>(name)
    }

    /// Declare a state that holds a `D` payload while current.
    pub fn pstate<D: Clone + 'static>(
        &self,
        name: impl Into<String>,
    ) -> Result<State<D>, MachineError> {
        self.ensure_live()?;
        let state = State::new(name, Rc::downgrade(&self.core));
        self.core.states.borrow_mut().push(state.node());
        Ok(state)
    }

    /// Declare a simple transition.
    pub fn transition(
        &self,
        name: impl Into<String>,
        source: impl Into<Source>,
        destination: &State,
    ) -> Result<Transition, MachineError> {
        self.ptransition(name, source, destination)
    }

    /// Declare a transition into a parameterized state.
    ///
    /// Every source state (unless the source is [`Source::Any`]) and the
    /// destination must have been declared on this machine. All offending
    /// references are reported together.
    pub fn ptransition<D: Clone + 'static>(
        &self,
        name: impl Into<String>,
        source: impl Into<Source>,
        destination: &State<D>,
    ) -> Result<Transition<D>, MachineError> {
        self.ensure_live()?;
        let name = name.into();
        let source = source.into();

        let check = validation::check_transition(&source, &destination.key(), |key| {
            self.owns(key)
        });
        if check.is_failure() {
            return Err(MachineError::InvalidWiring {
                transition: name,
                violations: validation::violations(check),
            });
        }

        Ok(Transition::new(
            name,
            source,
            destination.clone(),
            Rc::downgrade(&self.core),
        ))
    }

    /// Assign a simple initial state.
    pub fn initialize(&self, state: &State) -> Result<(), MachineError> {
        self.initialize_with(state, ())
    }

    /// Assign the initial state and the payload it is entered with on
    /// every start.
    pub fn initialize_with<D: Clone + 'static>(
        &self,
        state: &State<D>,
        data: D,
    ) -> Result<(), MachineError> {
        self.ensure_live()?;
        if self.core.initial.borrow().is_some() {
            return Err(MachineError::AlreadyInitialized {
                machine: self.name().to_string(),
            });
        }
        if !self.owns(&state.key()) {
            return Err(MachineError::ForeignState {
                machine: self.name().to_string(),
                state: state.name().to_string(),
            });
        }

        let destination = state.clone();
        let enter: InitialEntry =
            Rc::new(move |machine: &Machine| machine.change_to(&destination, data.clone(), None));
        *self.core.initial.borrow_mut() = Some((state.key(), enter));
        debug!(machine = %self.name(), initial = %state.name(), "machine initialized");
        Ok(())
    }

    /// Enter the initial state, then replay queued attempts in order.
    ///
    /// Every machine nested anywhere below this one must already be
    /// initialized. Starting a running machine does nothing.
    pub fn start(&self) -> Result<(), MachineError> {
        if self.is_nested() {
            return Err(self.nested_lifecycle());
        }
        self.ensure_live()?;
        self.ensure_initialized()?;
        self.ensure_nested_ready(self.name())?;
        self.launch()
    }

    /// Exit the current state and return to the terminal position.
    pub fn stop(&self) -> Result<(), MachineError> {
        if self.is_nested() {
            return Err(self.nested_lifecycle());
        }
        self.halt();
        Ok(())
    }

    /// Stop, close every notification channel, and dispose every state and
    /// nested machine. Disposing twice does nothing.
    pub fn dispose(&self) -> Result<(), MachineError> {
        if self.is_nested() {
            return Err(self.nested_lifecycle());
        }
        self.teardown();
        Ok(())
    }

    /// Called with every new position, including the terminal one on stop.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Current) + 'static,
    {
        self.core.changed.subscribe(callback)
    }

    pub(crate) fn launch(&self) -> Result<(), MachineError> {
        self.ensure_live()?;
        if self.is_running() {
            return Ok(());
        }
        let (initial, enter) = self
            .core
            .initial
            .borrow()
            .as_ref()
            .map(|(key, enter)| (key.clone(), Rc::clone(enter)))
            .ok_or_else(|| MachineError::NotInitialized {
                machine: self.name().to_string(),
            })?;

        debug!(machine = %self.name(), initial = %initial, "machine starting");
        self.core.started.set(true);
        enter(self);
        if self.is_disposed() {
            return Ok(());
        }
        self.replay_pending();
        Ok(())
    }

    /// Start as a side effect of the owning state being entered.
    ///
    /// # Panics
    ///
    /// Panics if the machine was never initialized. [`Machine::start`]
    /// checks the whole tree up front, so this only happens when a child is
    /// nested after the root started and is entered before it is
    /// initialized.
    pub(crate) fn start_nested(&self) {
        if let Err(err) = self.launch() {
            panic!("cannot enter nested machine: {err}");
        }
    }

    pub(crate) fn halt(&self) {
        if !self.is_running() {
            return;
        }
        debug!(machine = %self.name(), "machine stopping");
        let from = self.exit_current();
        if self.is_disposed() {
            return;
        }
        self.settle(None, &from, None);
    }

    pub(crate) fn teardown(&self) {
        if self.is_disposed() {
            return;
        }
        self.halt();
        if self.is_disposed() {
            return;
        }
        self.core.disposed.set(true);
        self.core.changed.close();
        self.core.pending.borrow_mut().clear();
        self.core.initial.borrow_mut().take();
        let states = std::mem::take(&mut *self.core.states.borrow_mut());
        for state in states {
            state.dispose();
        }
        debug!(machine = %self.name(), "machine disposed");
    }

    pub(crate) fn enqueue(&self, transition: &str, replay: Box<dyn FnOnce() -> Outcome>) {
        self.core.pending.borrow_mut().push_back(PendingAttempt {
            transition: transition.to_string(),
            replay,
        });
    }

    /// Apply an accepted change into `destination`.
    pub(crate) fn change_to<D: Clone + 'static>(
        &self,
        destination: &State<D>,
        data: D,
        via: Option<&str>,
    ) {
        let from = self.exit_current();
        // An exit listener may have disposed the machine.
        if self.is_disposed() {
            return;
        }
        self.settle(Some(destination.node()), &from, via);

        // A listener may already have moved the machine elsewhere.
        if self.core.is_current(&destination.key()) {
            destination.inner.enter(data);
        } else {
            trace!(
                machine = %self.name(),
                state = %destination.name(),
                "entry superseded by re-entrant transition"
            );
        }
    }

    fn current_node(&self) -> Option<Rc<dyn StateNode>> {
        self.core.current.borrow().clone()
    }

    /// Run the exit path of the current state, returning the position that
    /// was left last.
    ///
    /// Exit listeners may apply changes of their own, possibly back into the
    /// state being left. Whatever such a change entered is exited as well.
    fn exit_current(&self) -> Current {
        let Some(mut node) = self.current_node() else {
            return Current::Terminal;
        };
        loop {
            let changes = self.core.changes.get();
            node.exit();
            if self.core.changes.get() == changes {
                break;
            }
            match self.current_node() {
                Some(next) => node = next,
                None => return Current::Terminal,
            }
        }
        Current::State(node.key().clone())
    }

    /// Reassign the current pointer, record it, and notify listeners.
    fn settle(&self, node: Option<Rc<dyn StateNode>>, from: &Current, via: Option<&str>) {
        let to = match &node {
            Some(node) => Current::State(node.key().clone()),
            None => Current::Terminal,
        };
        *self.core.current.borrow_mut() = node;
        self.core.changes.set(self.core.changes.get().wrapping_add(1));

        self.core.history.borrow_mut().record(TransitionRecord {
            transition: via.map(str::to_string),
            from: from.name().to_string(),
            to: to.name().to_string(),
            timestamp: Utc::now(),
        });
        debug!(
            machine = %self.name(),
            transition = via.unwrap_or("-"),
            from = %from,
            to = %to,
            "state changed"
        );

        self.core.changed.emit(&to);
    }

    fn replay_pending(&self) {
        let queued = std::mem::take(&mut *self.core.pending.borrow_mut());
        if queued.is_empty() {
            return;
        }
        debug!(machine = %self.name(), count = queued.len(), "replaying queued attempts");
        for attempt in queued {
            let outcome = (attempt.replay)();
            trace!(
                machine = %self.name(),
                transition = %attempt.transition,
                ?outcome,
                "queued attempt replayed"
            );
        }
    }

    fn ensure_live(&self) -> Result<(), MachineError> {
        if self.is_disposed() {
            return Err(MachineError::Disposed {
                machine: self.name().to_string(),
            });
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), MachineError> {
        if self.core.initial.borrow().is_none() {
            return Err(MachineError::NotInitialized {
                machine: self.name().to_string(),
            });
        }
        Ok(())
    }

    fn ensure_nested_ready(&self, path: &str) -> Result<(), MachineError> {
        let states = self.core.states.borrow().clone();
        for state in states {
            for child in state.submachines() {
                let child_path = format!("{path}.{}.{}", state.key().name(), child.name());
                if child.core.initial.borrow().is_none() {
                    return Err(MachineError::NestedNotInitialized { path: child_path });
                }
                child.ensure_nested_ready(&child_path)?;
            }
        }
        Ok(())
    }

    fn nested_lifecycle(&self) -> MachineError {
        MachineError::NestedLifecycle {
            machine: self.name().to_string(),
        }
    }

    pub(crate) fn state_nodes(&self) -> Vec<Rc<dyn StateNode>> {
        self.core.states.borrow().clone()
    }
}

impl Clone for Machine {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl PartialEq for Machine {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Eq for Machine {}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.core.id)
            .field("name", &self.core.config.name)
            .field("phase", &self.phase())
            .field("current", &self.current().name())
            .finish()
    }
}

/// Renders the current state, followed by ` -> ` and the comma-joined
/// rendering of its nested machines when it has any.
impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(node) = self.current_node() else {
            return f.write_str(TERMINAL_NAME);
        };
        f.write_str(node.key().name())?;

        let nested = node.submachines();
        if !nested.is_empty() {
            f.write_str(" -> ")?;
            for (i, machine) in nested.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{machine}")?;
            }
        }
        Ok(())
    }
}
