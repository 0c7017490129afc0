//! The executing machine.
//!
//! This module holds everything that refers to a live machine:
//! - [`Machine`]: lifecycle, queueing, and the state-change protocol
//! - [`State`]: activity, payload, guards, listeners, nesting
//! - [`Transition`]: guarded edges and the acceptance algorithm
//!
//! Machines, states, and transitions are single-threaded handles (`!Send`).
//! An embedding application that needs them on several threads must keep
//! each machine tree on one thread and forward requests to it.

mod error;
mod machine;
mod state;
mod transition;

pub use error::{InactiveState, MachineError};
pub use machine::{Machine, MachineId, Phase};
pub use state::State;
pub use transition::{Outcome, Transition};

pub(crate) use state::StateNode;
