//! File watcher that feeds hand edits of the settings file to the apply loop

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use tokio::sync::mpsc;

use beacon_settings::{FileState, SettingsHandle, YamlFileStore};
use beacon_utils::{BeaconError, Result};

/// Watches the persisted settings file for external changes
pub struct SettingsFileWatcher {
    /// File being watched
    path: PathBuf,
    /// The store the apply loop saves through
    store: Arc<YamlFileStore>,
    rx: mpsc::UnboundedReceiver<Result<Vec<Event>>>,
    /// Debouncer handle (kept alive)
    _debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
}

impl SettingsFileWatcher {
    /// Create a watcher on the directory holding the store's file
    pub fn new(store: Arc<YamlFileStore>) -> Result<Self> {
        let path = store.path().to_path_buf();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        beacon_utils::paths::ensure_dir(&dir).map_err(|e| BeaconError::FileWrite {
            path: dir.clone(),
            source: e,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(
            Duration::from_millis(100),
            None,
            move |result: DebounceEventResult| {
                let events = result
                    .map(|events| events.into_iter().map(|e| e.event).collect())
                    .map_err(|errs| BeaconError::config(format!("Watch error: {:?}", errs)));
                let _ = tx.send(events);
            },
        )
        .map_err(|e| BeaconError::config(format!("Failed to create watcher: {}", e)))?;

        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| BeaconError::config(format!("Failed to watch: {}", e)))?;

        Ok(Self {
            path,
            store,
            rx,
            _debouncer: debouncer,
        })
    }

    /// Run until the watcher shuts down, submitting every external edit
    pub async fn run(self, handle: SettingsHandle) {
        let Self {
            path,
            store,
            mut rx,
            _debouncer,
        } = self;
        tracing::info!("Settings watcher started for {:?}", path);

        while let Some(result) = rx.recv().await {
            match result {
                Ok(events) => {
                    if events.iter().any(|e| is_settings_change(e, &path)) {
                        handle_change(&store, &handle).await;
                    }
                }
                Err(e) => {
                    tracing::error!("Settings watch error: {}", e);
                }
            }
        }
    }
}

async fn handle_change(store: &YamlFileStore, handle: &SettingsHandle) {
    let batch = match store.read_edit() {
        Ok(FileState::Edited(batch)) => batch,
        Ok(FileState::Unchanged) => {
            tracing::trace!("Settings file matches the last save");
            return;
        }
        Ok(FileState::Missing) => {
            tracing::debug!("Settings file removed, keeping in-memory state");
            return;
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable settings file (keeping current): {}", e);
            return;
        }
    };

    tracing::info!("Settings file changed, applying...");
    match handle.submit(batch).await {
        Ok(report) => tracing::info!(
            applied = ?report.applied,
            ignored = ?report.ignored,
            "Applied settings file edit"
        ),
        Err(e) => tracing::error!("Could not apply settings file edit: {}", e),
    }
}

/// Check if an event is a create/modify of the watched file
fn is_settings_change(event: &Event, path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };

    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p.file_name() == Some(name))
}
