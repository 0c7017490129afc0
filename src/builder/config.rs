//! Serializable machine configuration.

use serde::{Deserialize, Serialize};

/// Settings fixed when a machine is created.
///
/// Missing fields take their defaults when deserializing, so a bare
/// `{ "name": "door" }` is a complete configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Diagnostic name; need not be unique
    pub name: String,

    /// Keep transition attempts made before start and replay them on start
    pub queue: bool,

    /// Number of applied changes kept in history; 0 disables history
    pub history_limit: usize,
}

impl MachineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
