//! Logging infrastructure for beacon
//!
//! Provides unified logging setup using the tracing ecosystem.

use std::fs::File;

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, BeaconError, Result};

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "BEACON_LOG";

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr
    Stderr,
    /// Log to file (for the daemon)
    File,
    /// Log to both stderr and file
    Both,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "beacon_settings=debug")
    pub filter: String,
    /// Include file/line in logs
    pub file_line: bool,
    /// Optional custom log file name (defaults to "beacon.log")
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Create config for the daemon
    ///
    /// Logs go to stderr because stdout carries the settings snapshots.
    pub fn daemon() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| "info".into()),
            file_line: true,
            file_name: None,
        }
    }

    /// Override the filter, keeping the rest
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Override the output, keeping the rest
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| BeaconError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = fmt_layer
        .with_file(config.file_line)
        .with_line_number(config.file_line);

    let file_name = config.file_name.as_deref().unwrap_or("beacon.log");

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| BeaconError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let file = open_log_file(file_name)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| BeaconError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::Both => {
            let file = open_log_file(file_name)?;
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
                .map_err(|e| BeaconError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

fn open_log_file(file_name: &str) -> Result<File> {
    let log_dir = paths::log_dir();
    std::fs::create_dir_all(&log_dir).map_err(|e| BeaconError::FileWrite {
        path: log_dir.clone(),
        source: e,
    })?;

    let log_path = log_dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| BeaconError::FileWrite {
            path: log_path,
            source: e,
        })
}
