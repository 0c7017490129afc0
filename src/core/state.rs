//! State identity and the two reserved sentinel positions.
//!
//! States are identified by reference, not by name: two states of the same
//! machine may share a name. Every declared state receives a [`StateId`]
//! when it is created, and a [`StateKey`] pairs that id with the name for
//! diagnostics.
//!
//! The wildcard source and the terminal position are not states at all.
//! They are variants of [`Source`] and [`Current`], so no declared state can
//! ever collide with them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Display name of the terminal position.
pub const TERMINAL_NAME: &str = "None";

/// Display name of the wildcard source.
pub const ANY_NAME: &str = "Any";

/// Opaque identity of a declared state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(Uuid);

impl StateId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity plus name of a declared state.
///
/// Equality only considers the id, so two keys with the same name but
/// different origins are different states.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateKey {
    id: StateId,
    name: String,
}

impl StateKey {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            id: StateId::new(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for StateKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StateKey {}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The set of states a transition may leave from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Matches whatever state is current.
    Any,
    /// Matches only the listed states.
    States(Vec<StateKey>),
}

impl Source {
    /// Whether a transition with this source applies while `current` is
    /// the machine's position. The terminal position is never admitted.
    pub fn admits(&self, current: &Current) -> bool {
        match (self, current) {
            (_, Current::Terminal) => false,
            (Self::Any, Current::State(_)) => true,
            (Self::States(keys), Current::State(key)) => keys.contains(key),
        }
    }

    pub(crate) fn keys(&self) -> &[StateKey] {
        match self {
            Self::Any => &[],
            Self::States(keys) => keys,
        }
    }
}

impl From<StateKey> for Source {
    fn from(key: StateKey) -> Self {
        Self::States(vec![key])
    }
}

impl From<Vec<StateKey>> for Source {
    fn from(keys: Vec<StateKey>) -> Self {
        Self::States(keys)
    }
}

impl<const N: usize> From<[StateKey; N]> for Source {
    fn from(keys: [StateKey; N]) -> Self {
        Self::States(keys.to_vec())
    }
}

impl FromIterator<StateKey> for Source {
    fn from_iter<I: IntoIterator<Item = StateKey>>(iter: I) -> Self {
        Self::States(iter.into_iter().collect())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(ANY_NAME),
            Self::States(keys) => {
                f.write_str("{")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(key.name())?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Position of a machine: either a declared state or the terminal marker.
///
/// A machine sits at [`Current::Terminal`] before it starts and after it
/// stops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Current {
    #[default]
    Terminal,
    State(StateKey),
}

impl Current {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Terminal => TERMINAL_NAME,
            Self::State(key) => key.name(),
        }
    }

    pub fn key(&self) -> Option<&StateKey> {
        match self {
            Self::Terminal => None,
            Self::State(key) => Some(key),
        }
    }
}

impl fmt::Display for Current {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
