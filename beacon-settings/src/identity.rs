//! Device identity providers
//!
//! The device ID is derived once per installation and then stored with the
//! rest of the settings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use beacon_utils::{BeaconError, Result};

/// Length in bytes of the encoded node identifier (a MAC-sized value)
pub const NODE_ID_LEN: usize = 6;

/// Source of the stable per-installation device ID
pub trait DeviceIdentity: Send + Sync {
    /// Derive the device ID from host identity
    fn derive_device_id(&self) -> Result<String>;
}

/// Derives the device ID from the host's machine ID
#[derive(Debug, Clone, Copy, Default)]
pub struct MachineIdentity;

impl DeviceIdentity for MachineIdentity {
    fn derive_device_id(&self) -> Result<String> {
        let machine_id = machine_uid::get().map_err(|e| BeaconError::device_identity(e.to_string()))?;
        encode_node_id(&machine_id)
    }
}

/// Encode a host identifier as a base64 node ID
///
/// The identifier is hashed so the raw machine ID never leaves the host.
pub fn encode_node_id(machine_id: &str) -> Result<String> {
    let machine_id = machine_id.trim();
    if machine_id.is_empty() {
        return Err(BeaconError::device_identity("host reported an empty machine ID"));
    }

    let digest = Sha256::digest(machine_id.as_bytes());
    Ok(STANDARD.encode(&digest[..NODE_ID_LEN]))
}

/// A constant device ID, for embedders that manage identity themselves
#[derive(Debug, Clone)]
pub struct FixedIdentity(String);

impl FixedIdentity {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self(device_id.into())
    }
}

impl DeviceIdentity for FixedIdentity {
    fn derive_device_id(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(BeaconError::device_identity("fixed device ID is empty"));
        }
        Ok(self.0.clone())
    }
}
