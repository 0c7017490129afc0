//! Nestate: an embeddable runtime for hierarchical finite state machines
//!
//! Consumers declare states and guarded transitions on a [`Machine`], nest
//! independent child machines inside states, and observe entry, exit, and
//! position changes through synchronous listeners.
//!
//! # Core Concepts
//!
//! - **Machine**: owns its states, the current-state pointer, and a queue of
//!   attempts made before it starts
//! - **State**: a named node, optionally carrying a typed payload while
//!   current, optionally owning nested machines
//! - **Transition**: a guarded edge from a set of states (or any state) to
//!   one destination
//! - **Guards**: predicates over the payload; every one must pass
//!
//! Nested machines start when their owning state is entered and stop when
//! it is exited, recursively.
//!
//! # Example
//!
//! ```rust
//! use nestate::Machine;
//!
//! let switch = Machine::new("switch");
//! let off = switch.state("off")?;
//! let on = switch.state("on")?;
//! let turn_on = switch.transition("turnOn", &off, &on)?;
//! let turn_off = switch.transition("turnOff", &on, &off)?;
//!
//! let color = on.nest("color");
//! let blue = color.state("blue")?;
//! let red = color.state("red")?;
//! let to_red = color.transition("toRed", &blue, &red)?;
//! color.initialize(&blue)?;
//!
//! switch.initialize(&off)?;
//! switch.start()?;
//! assert_eq!(switch.to_string(), "off");
//!
//! assert!(turn_on.fire());
//! assert_eq!(switch.to_string(), "on -> blue");
//!
//! assert!(to_red.fire());
//! assert_eq!(switch.to_string(), "on -> red");
//!
//! assert!(turn_off.fire());
//! assert_eq!(switch.to_string(), "off");
//! assert!(!blue.is_active() && !red.is_active());
//! # Ok::<(), nestate::MachineError>(())
//! ```

pub mod builder;
pub mod core;
pub mod runtime;
pub mod signal;
pub mod snapshot;
pub mod validation;

// Re-export commonly used types
pub use builder::{MachineBuilder, MachineConfig};
pub use core::{Current, Guard, Source, StateHistory, StateKey, TransitionRecord};
pub use runtime::{InactiveState, Machine, MachineError, Outcome, Phase, State, Transition};
pub use signal::Subscription;
pub use snapshot::{MachineSnapshot, StateSnapshot};
