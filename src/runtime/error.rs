//! Runtime errors.

use crate::validation::WiringViolation;
use thiserror::Error;

/// Precondition violations raised by machine operations.
///
/// Each of these indicates a wiring bug in the calling code rather than a
/// transient condition; none of them is ever retried internally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MachineError {
    #[error("Machine '{machine}' has no initial state. Call initialize() before start()")]
    NotInitialized { machine: String },

    #[error("Machine '{machine}' is already initialized")]
    AlreadyInitialized { machine: String },

    #[error("State '{state}' does not belong to machine '{machine}'")]
    ForeignState { machine: String, state: String },

    #[error("Transition '{transition}' has {} invalid state reference(s)", .violations.len())]
    InvalidWiring {
        transition: String,
        violations: Vec<WiringViolation>,
    },

    #[error("Nested machine '{path}' is not initialized")]
    NestedNotInitialized { path: String },

    #[error("Machine '{machine}' is nested; it starts and stops with its owning state")]
    NestedLifecycle { machine: String },

    #[error("Machine '{machine}' has been disposed")]
    Disposed { machine: String },
}

/// Returned when reading the payload of a state that is not current.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("State '{state}' is not active")]
pub struct InactiveState {
    pub state: String,
}
