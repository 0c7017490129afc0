//! Core value types shared by the runtime.
//!
//! This module contains the pieces that hold no reference to a running
//! machine:
//! - State identity and the wildcard/terminal sentinels
//! - Guard predicates and ordered guard lists
//! - Bounded transition history

mod guard;
mod history;
mod state;

pub use guard::{Guard, GuardSet};
pub use history::{StateHistory, TransitionRecord};
pub use state::{Current, Source, StateId, StateKey, ANY_NAME, TERMINAL_NAME};
