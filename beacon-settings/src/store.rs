//! Durable storage for the settings record

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;

use beacon_utils::{BeaconError, Result};

use crate::coerce::UpdateBatch;
use crate::record::PersistedSettings;

/// Load/save adapter for the persisted settings fields
pub trait SettingsStore: Send + Sync {
    /// Read the stored record, `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<PersistedSettings>>;

    /// Replace the stored record
    fn save(&self, settings: &PersistedSettings) -> Result<()>;
}

/// What the settings file holds relative to the last load or save
#[derive(Debug, Clone, PartialEq)]
pub enum FileState {
    /// No file on disk
    Missing,
    /// Same content this store last loaded or wrote
    Unchanged,
    /// Changed by someone else
    Edited(UpdateBatch),
}

/// Settings stored as a YAML file
///
/// The store remembers the record it last loaded or wrote, so edits made
/// outside the process can be told apart from its own saves.
#[derive(Debug)]
pub struct YamlFileStore {
    path: PathBuf,
    synced: Mutex<Option<PersistedSettings>>,
}

impl YamlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            synced: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BeaconError::FileRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Read the file as an untyped update batch
    ///
    /// Used when the file is edited by hand and should flow through the
    /// regular apply path. A document that is not a mapping is an error.
    pub fn read_batch(&self) -> Result<Option<UpdateBatch>> {
        let Some(content) = self.read()? else {
            return Ok(None);
        };

        let value: Value = serde_yaml::from_str(&content).map_err(|e| {
            BeaconError::persistence(format!("{}: {}", self.path.display(), e))
        })?;

        match value {
            Value::Object(batch) => Ok(Some(batch)),
            Value::Null => Ok(Some(UpdateBatch::new())),
            _ => Err(BeaconError::persistence(format!(
                "{}: expected a mapping at the document root",
                self.path.display()
            ))),
        }
    }

    /// Read the file and classify it against the last synced record
    ///
    /// Holds the sync lock for the whole read, so a save cannot land between
    /// reading the file and comparing it.
    pub fn read_edit(&self) -> Result<FileState> {
        let synced = self.synced.lock();
        let Some(batch) = self.read_batch()? else {
            return Ok(FileState::Missing);
        };

        match synced.as_ref() {
            Some(last) if matches_record(&batch, last) => Ok(FileState::Unchanged),
            _ => Ok(FileState::Edited(batch)),
        }
    }
}

/// Whether the batch deserializes to exactly `record`
fn matches_record(batch: &UpdateBatch, record: &PersistedSettings) -> bool {
    serde_json::from_value::<PersistedSettings>(Value::Object(batch.clone()))
        .map(|on_disk| &on_disk == record)
        .unwrap_or(false)
}

impl SettingsStore for YamlFileStore {
    fn load(&self) -> Result<Option<PersistedSettings>> {
        let Some(content) = self.read()? else {
            return Ok(None);
        };

        let loaded: PersistedSettings = serde_yaml::from_str(&content)
            .map_err(|e| BeaconError::persistence(format!("{}: {}", self.path.display(), e)))?;
        *self.synced.lock() = Some(loaded.clone());
        Ok(Some(loaded))
    }

    fn save(&self, settings: &PersistedSettings) -> Result<()> {
        let content = serde_yaml::to_string(settings)
            .map_err(|e| BeaconError::serialization(e.to_string()))?;

        let mut synced = self.synced.lock();
        if let Some(parent) = self.path.parent() {
            beacon_utils::paths::ensure_dir(parent).map_err(|e| BeaconError::FileWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        // Write then rename so readers never see a half-written file
        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, content).map_err(|e| BeaconError::FileWrite {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| BeaconError::FileWrite {
            path: self.path.clone(),
            source: e,
        })?;

        *synced = Some(settings.clone());
        tracing::trace!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// In-process store that keeps every saved record
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: Mutex<Option<PersistedSettings>>,
    history: Mutex<Vec<PersistedSettings>>,
    fail_saves: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `settings`
    pub fn with_settings(settings: PersistedSettings) -> Self {
        Self {
            current: Mutex::new(Some(settings)),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// The most recently saved record
    pub fn current(&self) -> Option<PersistedSettings> {
        self.current.lock().clone()
    }

    /// Every successfully saved record, oldest first
    pub fn history(&self) -> Vec<PersistedSettings> {
        self.history.lock().clone()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedSettings>> {
        Ok(self.current.lock().clone())
    }

    fn save(&self, settings: &PersistedSettings) -> Result<()> {
        if *self.fail_saves.lock() {
            return Err(BeaconError::persistence("memory store rejected save"));
        }
        *self.current.lock() = Some(settings.clone());
        self.history.lock().push(settings.clone());
        Ok(())
    }
}
