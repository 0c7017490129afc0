//! Machine configuration and the fluent builder.
//!
//! [`MachineConfig`] is the serializable form, suitable for embedding in a
//! host application's own configuration files. [`MachineBuilder`] is the
//! fluent form used from code.

pub mod config;
pub mod machine;

pub use config::MachineConfig;
pub use machine::MachineBuilder;
