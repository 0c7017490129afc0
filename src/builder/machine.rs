//! Builder for constructing machines.

use crate::builder::config::MachineConfig;
use crate::runtime::Machine;

/// Builder for constructing machines with a fluent API.
///
/// # Example
///
/// ```rust
/// use nestate::builder::MachineBuilder;
///
/// let machine = MachineBuilder::new("door").queue(true).history_limit(16).build();
///
/// assert!(machine.queues());
/// assert_eq!(machine.config().history_limit, 16);
/// ```
#[derive(Clone, Debug)]
pub struct MachineBuilder {
    config: MachineConfig,
}

impl MachineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: MachineConfig::new(name),
        }
    }

    /// Keep attempts made before start and replay them on start.
    pub fn queue(mut self, enabled: bool) -> Self {
        self.config.queue = enabled;
        self
    }

    /// Keep the last `limit` applied changes; 0 disables history.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    /// The configuration built so far, for use with
    /// [`State::nest_with`](crate::State::nest_with).
    pub fn config(self) -> MachineConfig {
        self.config
    }

    pub fn build(self) -> Machine {
        Machine::from_config(self.config)
    }
}

impl From<MachineConfig> for MachineBuilder {
    fn from(config: MachineConfig) -> Self {
        Self { config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let machine = MachineBuilder::new("m").build();

        assert_eq!(machine.name(), "m");
        assert!(!machine.queues());
        assert!(!machine.history().is_enabled());
        assert!(!machine.is_nested());
    }

    #[test]
    fn fluent_api_sets_every_field() {
        let config = MachineBuilder::new("m").queue(true).history_limit(3).config();

        assert_eq!(
            config,
            MachineConfig {
                name: "m".to_string(),
                queue: true,
                history_limit: 3,
            }
        );
    }

    #[test]
    fn builder_round_trips_config() {
        let config = MachineConfig {
            name: "m".to_string(),
            queue: true,
            history_limit: 5,
        };
        let machine = MachineBuilder::from(config.clone()).build();

        assert_eq!(machine.config(), &config);
        assert_eq!(machine.history().limit(), 5);
    }
}
