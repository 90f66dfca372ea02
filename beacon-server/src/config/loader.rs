//! Configuration loader

use std::path::Path;

use beacon_utils::{config_file, BeaconError, Result};

use super::ServerConfig;

/// Upper bound for the request queue
const MAX_QUEUE_CAPACITY: usize = 4096;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<ServerConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(ServerConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<ServerConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| BeaconError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<ServerConfig> {
        toml::from_str(content).map_err(|e| BeaconError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &ServerConfig) -> Result<()> {
        let capacity = config.settings.queue_capacity;
        if capacity == 0 || capacity > MAX_QUEUE_CAPACITY {
            return Err(BeaconError::config(format!(
                "queue_capacity must be between 1 and {}",
                MAX_QUEUE_CAPACITY
            )));
        }

        if let Some(path) = &config.settings.path {
            if path.as_os_str().is_empty() || path.file_name().is_none() {
                return Err(BeaconError::config("settings path must name a file"));
            }
        }

        Ok(())
    }

    /// Load from `path` (or the default location) and validate
    pub fn load_and_validate(path: Option<&Path>) -> Result<ServerConfig> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Self::validate(&config)?;
        Ok(config)
    }
}
