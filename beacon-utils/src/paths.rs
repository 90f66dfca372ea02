//! Path utilities for beacon
//!
//! Handles XDG Base Directory specification compliance for config,
//! data and state directories.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Application identifier for XDG directories
const APP_NAME: &str = "beacon";

/// File name of the persisted settings record
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/beacon` or `~/.config/beacon`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the daemon configuration file path
///
/// Location: `$XDG_CONFIG_HOME/beacon/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the data directory
///
/// Location: `$XDG_DATA_HOME/beacon` or `~/.local/share/beacon`
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(fallback_data_dir)
}

/// Get the default persisted settings file
///
/// Location: `$XDG_DATA_HOME/beacon/settings.yaml`
pub fn settings_file() -> PathBuf {
    data_dir().join(SETTINGS_FILE_NAME)
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/beacon` or `~/.local/state/beacon`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/beacon/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

fn fallback_data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join(APP_NAME)
}
