//! The typed settings record and its accessors
//!
//! One [`Settings`] exists per process. It is created by the composition
//! root and shared as `Arc<Settings>`; every accessor takes the internal
//! lock for exactly one field access.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use beacon_utils::Result;

use crate::identity::DeviceIdentity;
use crate::store::SettingsStore;

/// Build provenance, fixed at construction and never persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: String,
    pub revision_date: String,
    pub build_date: String,
}

impl BuildInfo {
    pub fn new(
        version: impl Into<String>,
        revision_date: impl Into<String>,
        build_date: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            revision_date: revision_date.into(),
            build_date: build_date.into(),
        }
    }
}

/// The user-facing fields that are written to durable storage
///
/// Missing keys in a stored file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSettings {
    #[serde(rename = "proxyAll")]
    pub proxy_all: bool,
    #[serde(rename = "systemProxy")]
    pub system_proxy: bool,
    #[serde(rename = "autoReport")]
    pub auto_report: bool,
    #[serde(rename = "autoLaunch")]
    pub auto_launch: bool,
    #[serde(rename = "userID")]
    pub user_id: i64,
    #[serde(rename = "userToken")]
    pub user_token: String,
    #[serde(rename = "deviceID")]
    pub device_id: String,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            proxy_all: false,
            system_proxy: true,
            auto_report: true,
            auto_launch: true,
            user_id: 0,
            user_token: String::new(),
            device_id: String::new(),
        }
    }
}

/// Point-in-time copy of every field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsSnapshot {
    #[serde(flatten)]
    pub build: BuildInfo,
    #[serde(flatten)]
    pub fields: PersistedSettings,
}

/// The process-wide settings record
#[derive(Debug)]
pub struct Settings {
    build: BuildInfo,
    fields: RwLock<PersistedSettings>,
}

impl Settings {
    /// Build a record from already-resolved fields
    pub fn new(build: BuildInfo, fields: PersistedSettings) -> Self {
        Self {
            build,
            fields: RwLock::new(fields),
        }
    }

    /// Load the record from `store`, falling back to defaults
    ///
    /// The device ID comes from the stored record when present; otherwise it
    /// is derived once from `identity` and the record is saved so the ID
    /// survives restarts. A derivation failure is returned to the caller.
    pub fn load(
        build: BuildInfo,
        store: &dyn SettingsStore,
        identity: &dyn DeviceIdentity,
    ) -> Result<Self> {
        let mut fields = match store.load() {
            Ok(Some(fields)) => {
                debug!("Loaded persisted settings");
                fields
            }
            Ok(None) => {
                info!("No persisted settings found, using defaults");
                PersistedSettings::default()
            }
            Err(e) => {
                warn!(error = %e, "Could not read persisted settings, using defaults");
                PersistedSettings::default()
            }
        };

        let derived = fields.device_id.is_empty();
        if derived {
            fields.device_id = identity.derive_device_id()?;
            info!(device_id = %fields.device_id, "Derived device ID");
        }

        let settings = Self::new(build, fields);

        if derived {
            if let Err(e) = store.save(&settings.persisted()) {
                warn!(error = %e, "Failed to save settings after deriving device ID");
            }
        }

        Ok(settings)
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.build
    }

    pub fn version(&self) -> &str {
        &self.build.version
    }

    pub fn revision_date(&self) -> &str {
        &self.build.revision_date
    }

    pub fn build_date(&self) -> &str {
        &self.build.build_date
    }

    pub fn proxy_all(&self) -> bool {
        self.fields.read().proxy_all
    }

    pub fn set_proxy_all(&self, proxy_all: bool) {
        self.fields.write().proxy_all = proxy_all;
    }

    pub fn system_proxy(&self) -> bool {
        self.fields.read().system_proxy
    }

    pub fn set_system_proxy(&self, system_proxy: bool) {
        self.fields.write().system_proxy = system_proxy;
    }

    pub fn auto_report(&self) -> bool {
        self.fields.read().auto_report
    }

    pub fn set_auto_report(&self, auto_report: bool) {
        self.fields.write().auto_report = auto_report;
    }

    pub fn auto_launch(&self) -> bool {
        self.fields.read().auto_launch
    }

    pub fn set_auto_launch(&self, auto_launch: bool) {
        self.fields.write().auto_launch = auto_launch;
    }

    /// Numeric account identifier, 0 when unset
    pub fn user_id(&self) -> i64 {
        self.fields.read().user_id
    }

    pub fn set_user_id(&self, user_id: i64) {
        self.fields.write().user_id = user_id;
    }

    /// Opaque auth token, empty when unset
    pub fn token(&self) -> String {
        self.fields.read().user_token.clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.fields.write().user_token = token.into();
    }

    pub fn device_id(&self) -> String {
        self.fields.read().device_id.clone()
    }

    /// Set the device ID if it has never been set
    ///
    /// Returns whether the value was stored. The ID is write-once.
    pub fn set_device_id(&self, device_id: impl Into<String>) -> bool {
        let mut fields = self.fields.write();
        if !fields.device_id.is_empty() {
            return false;
        }
        fields.device_id = device_id.into();
        true
    }

    /// Copy of the persisted fields
    pub fn persisted(&self) -> PersistedSettings {
        self.fields.read().clone()
    }

    /// Copy of every field, including build info
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            build: self.build.clone(),
            fields: self.persisted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FixedIdentity;
    use crate::store::{MemoryStore, YamlFileStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingIdentity(AtomicUsize);

    impl DeviceIdentity for CountingIdentity {
        fn derive_device_id(&self) -> Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("counted-device".into())
        }
    }

    struct BrokenIdentity;

    impl DeviceIdentity for BrokenIdentity {
        fn derive_device_id(&self) -> Result<String> {
            Err(beacon_utils::BeaconError::device_identity("no machine id"))
        }
    }

    fn build() -> BuildInfo {
        BuildInfo::new("1", "1/1/1", "1/1/1")
    }

    #[test]
    fn test_fresh_record_defaults() {
        let store = MemoryStore::new();
        let settings = Settings::load(build(), &store, &FixedIdentity::new("dev-1")).unwrap();

        assert!(!settings.proxy_all());
        assert_eq!(settings.user_id(), 0);
        assert!(settings.system_proxy());
        assert!(settings.auto_report());
        assert!(settings.auto_launch());
        assert_eq!(settings.token(), "");
        assert_eq!(settings.device_id(), "dev-1");
        assert_eq!(settings.version(), "1");
    }

    #[test]
    fn test_fresh_device_id_is_saved() {
        let store = MemoryStore::new();
        Settings::load(build(), &store, &FixedIdentity::new("dev-1")).unwrap();

        let saved = store.current().unwrap();
        assert_eq!(saved.device_id, "dev-1");
    }

    #[test]
    fn test_persisted_device_id_skips_derivation() {
        let store = MemoryStore::with_settings(PersistedSettings {
            device_id: "stored".into(),
            proxy_all: true,
            ..Default::default()
        });
        let identity = CountingIdentity(AtomicUsize::new(0));

        let settings = Settings::load(build(), &store, &identity).unwrap();

        assert_eq!(settings.device_id(), "stored");
        assert!(settings.proxy_all());
        assert_eq!(identity.0.load(Ordering::SeqCst), 0);
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_derivation_runs_once() {
        let store = MemoryStore::new();
        let identity = CountingIdentity(AtomicUsize::new(0));

        Settings::load(build(), &store, &identity).unwrap();
        assert_eq!(identity.0.load(Ordering::SeqCst), 1);

        // A restart reads the saved ID back
        let settings = Settings::load(build(), &store, &identity).unwrap();
        assert_eq!(identity.0.load(Ordering::SeqCst), 1);
        assert_eq!(settings.device_id(), "counted-device");
    }

    #[test]
    fn test_derivation_failure_propagates() {
        let store = MemoryStore::new();
        let result = Settings::load(build(), &store, &BrokenIdentity);
        assert!(matches!(result, Err(beacon_utils::BeaconError::DeviceIdentity(_))));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "proxyAll: [not, a, bool").unwrap();

        let store = YamlFileStore::new(&path);
        let settings = Settings::load(build(), &store, &FixedIdentity::new("dev-1")).unwrap();

        assert!(!settings.proxy_all());
        assert!(settings.system_proxy());
        assert_eq!(settings.device_id(), "dev-1");
    }

    #[test]
    fn test_version_not_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "version: from-disk\nbuildDate: 1999-1-1\ndeviceID: abc\n").unwrap();

        let store = YamlFileStore::new(&path);
        let build = BuildInfo::new("version-not-on-disk", "1970-1-1", "1970-1-1");
        let settings = Settings::load(build, &store, &FixedIdentity::new("unused")).unwrap();

        assert_eq!(settings.version(), "version-not-on-disk");
        assert_eq!(settings.build_date(), "1970-1-1");
        assert_eq!(settings.device_id(), "abc");
    }

    #[test]
    fn test_device_id_is_write_once() {
        let settings = Settings::new(build(), PersistedSettings::default());

        assert!(settings.set_device_id("first"));
        assert!(!settings.set_device_id("second"));
        assert_eq!(settings.device_id(), "first");
    }

    #[test]
    fn test_setters_overwrite() {
        let settings = Settings::new(build(), PersistedSettings::default());

        settings.set_proxy_all(true);
        settings.set_system_proxy(false);
        settings.set_auto_report(false);
        settings.set_auto_launch(false);
        settings.set_user_id(42);
        settings.set_token("t");

        let fields = settings.persisted();
        assert!(fields.proxy_all);
        assert!(!fields.system_proxy);
        assert!(!fields.auto_report);
        assert!(!fields.auto_launch);
        assert_eq!(fields.user_id, 42);
        assert_eq!(fields.user_token, "t");
    }

    #[test]
    fn test_concurrent_accessors() {
        let settings = Arc::new(Settings::new(build(), PersistedSettings::default()));

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let settings = Arc::clone(&settings);
                std::thread::spawn(move || {
                    for n in 0..500 {
                        settings.set_user_id(i * 1000 + n);
                        settings.set_token(format!("token-{i}-{n}"));
                        let _ = settings.snapshot();
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }

        let token = settings.token();
        assert!(token.starts_with("token-"));
        assert!(settings.user_id() % 1000 == 499);
    }

    #[test]
    fn test_snapshot_serializes_wire_keys() {
        let settings = Settings::new(
            build(),
            PersistedSettings {
                device_id: "d".into(),
                user_id: 7,
                ..Default::default()
            },
        );

        let json = serde_json::to_value(settings.snapshot()).unwrap();
        assert_eq!(json["deviceID"], "d");
        assert_eq!(json["userID"], 7);
        assert_eq!(json["systemProxy"], true);
        assert_eq!(json["version"], "1");
        assert_eq!(json["revisionDate"], "1/1/1");
    }
}
