//! Point-in-time views of a machine tree.
//!
//! A snapshot records names, activity, and lifecycle phase for a machine,
//! each of its states, and every machine nested below them. Snapshots are
//! for diagnostics only; there is no way to restore a machine from one.

use crate::runtime::{Machine, MachineId, Phase, StateNode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serializable view of one machine and everything below it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub id: MachineId,
    pub name: String,
    pub phase: Phase,
    /// Name of the current state; `None` while at the terminal position
    pub current: Option<String>,
    /// Attempts waiting for the next start
    pub pending: usize,
    pub states: Vec<StateSnapshot>,
    pub taken_at: DateTime<Utc>,
}

/// Serializable view of one declared state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub name: String,
    pub active: bool,
    pub submachines: Vec<MachineSnapshot>,
}

impl MachineSnapshot {
    /// Names of the current state at each level, following only the
    /// first nested machine of each active state.
    pub fn active_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut level = Some(self);
        while let Some(machine) = level {
            let Some(current) = machine.current.as_deref() else {
                break;
            };
            path.push(current);
            level = machine
                .states
                .iter()
                .find(|state| state.active)
                .and_then(|state| state.submachines.first());
        }
        path
    }
}

impl Machine {
    /// Capture the current shape and position of this machine tree.
    pub fn snapshot(&self) -> MachineSnapshot {
        let taken_at = Utc::now();
        self.snapshot_at(taken_at)
    }

    fn snapshot_at(&self, taken_at: DateTime<Utc>) -> MachineSnapshot {
        let current = self.current();
        let states = self
            .state_nodes()
            .iter()
            .map(|node| snapshot_state(&**node, current.key() == Some(node.key()), taken_at))
            .collect();

        MachineSnapshot {
            id: self.id(),
            name: self.name().to_string(),
            phase: self.phase(),
            current: current.key().map(|key| key.name().to_string()),
            pending: self.pending(),
            states,
            taken_at,
        }
    }
}

fn snapshot_state(node: &dyn StateNode, active: bool, taken_at: DateTime<Utc>) -> StateSnapshot {
    StateSnapshot {
        name: node.key().name().to_string(),
        active,
        submachines: node
            .submachines()
            .iter()
            .map(|machine| machine.snapshot_at(taken_at))
            .collect(),
    }
}
