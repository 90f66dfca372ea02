//! Configuration management for the beacon daemon
//!
//! This is the daemon's own TOML configuration, separate from the settings
//! record it serves.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;
