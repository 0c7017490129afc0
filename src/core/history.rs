//! Bounded record of applied state changes.
//!
//! Every applied change, including the initial entry at start and the
//! forced exit at stop, can be recorded with the name of the transition
//! that caused it. History is off unless a machine is configured with a
//! non-zero limit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single applied state change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Transition that caused the change; `None` for start and stop.
    pub transition: Option<String>,
    /// Name of the state left behind
    pub from: String,
    /// Name of the state entered
    pub to: String,
    /// When the change was applied
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of state changes, oldest first.
///
/// Holds at most `limit` records; recording past the limit drops the
/// oldest entry.
///
/// # Example
///
/// ```rust
/// use nestate::core::{StateHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = StateHistory::with_limit(2);
/// for (from, to) in [("None", "off"), ("off", "on"), ("on", "off")] {
///     history.record(TransitionRecord {
///         transition: None,
///         from: from.to_string(),
///         to: to.to_string(),
///         timestamp: Utc::now(),
///     });
/// }
///
/// assert_eq!(history.path(), vec!["off", "on", "off"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateHistory {
    limit: usize,
    records: VecDeque<TransitionRecord>,
}

impl StateHistory {
    /// History that keeps nothing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            records: VecDeque::with_capacity(limit.min(64)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn record(&mut self, record: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        while self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Names of the states traversed: the `from` of the oldest record,
    /// then the `to` of each record.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(first) = self.records.front() {
            path.push(first.from.as_str());
        }
        path.extend(self.records.iter().map(|r| r.to.as_str()));
        path
    }

    /// Time between the oldest and newest retained records.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
