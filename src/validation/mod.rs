//! Wiring checks for transition declarations.
//!
//! A transition may only reference states owned by the machine that
//! declares it. The checks here use Stillwater's `Validation` so that every
//! bad reference is reported at once instead of stopping at the first one.

use crate::core::{Source, StateKey};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// One invalid state reference in a transition declaration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WiringViolation {
    #[error("source state '{state}' is not owned by this machine")]
    ForeignSource { state: String },

    #[error("destination state '{state}' is not owned by this machine")]
    ForeignDestination { state: String },
}

pub type WiringCheck = Validation<(), NonEmptyVec<WiringViolation>>;

/// Check every source and the destination against `owns`.
///
/// The wildcard source is always valid.
pub fn check_transition<F>(source: &Source, destination: &StateKey, owns: F) -> WiringCheck
where
    F: Fn(&StateKey) -> bool,
{
    let mut checks: Vec<WiringCheck> = source
        .keys()
        .iter()
        .map(|key| {
            if owns(key) {
                Validation::success(())
            } else {
                Validation::fail(WiringViolation::ForeignSource {
                    state: key.name().to_string(),
                })
            }
        })
        .collect();

    checks.push(if owns(destination) {
        Validation::success(())
    } else {
        Validation::fail(WiringViolation::ForeignDestination {
            state: destination.name().to_string(),
        })
    });

    Validation::all_vec(checks).map(|_| ())
}

/// Flatten a failed check into a plain list.
pub fn violations(check: WiringCheck) -> Vec<WiringViolation> {
    match check {
        Validation::Success(_) => Vec::new(),
        Validation::Failure(errors) => errors.iter().cloned().collect(),
    }
}
