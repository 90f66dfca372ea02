//! Error types for beacon
//!
//! Provides a unified error type used across all beacon crates.

use std::path::PathBuf;

/// Main error type for beacon operations
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Settings Errors ===

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Failed to derive device ID: {0}")]
    DeviceIdentity(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Settings apply loop is no longer running")]
    LoopClosed,

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BeaconError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a device identity error
    pub fn device_identity(msg: impl Into<String>) -> Self {
        Self::DeviceIdentity(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using BeaconError
pub type Result<T> = std::result::Result<T, BeaconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = BeaconError::Io(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = BeaconError::FileRead {
            path: PathBuf::from("/etc/beacon/settings.yaml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/etc/beacon/settings.yaml"));
    }

    #[test]
    fn test_error_display_file_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = BeaconError::FileWrite {
            path: PathBuf::from("/root/settings.yaml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to write file"));
        assert!(msg.contains("/root/settings.yaml"));
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = BeaconError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/beacon/config.toml"),
            message: "syntax error".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("config.toml"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn test_error_display_device_identity() {
        let err = BeaconError::device_identity("no machine id");
        assert_eq!(err.to_string(), "Failed to derive device ID: no machine id");
    }

    #[test]
    fn test_error_display_loop_closed() {
        let err = BeaconError::LoopClosed;
        assert_eq!(err.to_string(), "Settings apply loop is no longer running");
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(BeaconError::config("x"), BeaconError::Config(_)));
        assert!(matches!(BeaconError::persistence("x"), BeaconError::Persistence(_)));
        assert!(matches!(BeaconError::serialization("x"), BeaconError::Serialization(_)));
        assert_eq!(
            BeaconError::internal("invariant violated").to_string(),
            "Internal error: invariant violated"
        );
    }

    #[test]
    fn test_from_io_error_preserves_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: BeaconError = io_err.into();
        if let BeaconError::Io(inner) = err {
            assert_eq!(inner.kind(), std::io::ErrorKind::PermissionDenied);
        } else {
            panic!("Expected Io variant");
        }
    }
}
