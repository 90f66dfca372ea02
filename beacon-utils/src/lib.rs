//! beacon-utils: Common utilities shared across beacon crates
//!
//! This crate provides:
//! - Unified error types ([`BeaconError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{BeaconError, Result};
pub use logging::{init_logging_with_config, LogConfig, LogOutput};

pub use paths::{config_dir, config_file, data_dir, log_dir, settings_file, state_dir};
