//! Configuration schema structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use beacon_settings::DEFAULT_QUEUE_CAPACITY;
use beacon_utils::LogOutput;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub settings: SettingsConfig,
    pub logging: LoggingConfig,
}

/// Settings record and apply loop options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Persisted settings file (defaults to the XDG data dir)
    pub path: Option<PathBuf>,
    /// Requests that may queue before producers wait
    pub queue_capacity: usize,
    /// Apply hand edits of the settings file
    pub watch_file: bool,
    /// Accept JSON-lines batches on stdin
    pub read_stdin: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            watch_file: true,
            read_stdin: true,
        }
    }
}

impl SettingsConfig {
    /// Settings file path with the XDG default applied
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(beacon_utils::settings_file)
    }
}

/// Where log output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Stderr,
    File,
    Both,
}

impl From<LogTarget> for LogOutput {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Stderr => LogOutput::Stderr,
            LogTarget::File => LogOutput::File,
            LogTarget::Both => LogOutput::Both,
        }
    }
}

/// Logging options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `BEACON_LOG` is unset
    pub filter: String,
    pub output: LogTarget,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            output: LogTarget::Stderr,
        }
    }
}
