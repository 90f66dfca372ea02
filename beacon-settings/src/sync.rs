//! The update apply loop
//!
//! A single consumer task drains update requests in order. For each one it
//! applies the batch through the field table, persists the record, publishes
//! the new snapshot and only then acknowledges the producer. Producers talk
//! to the loop through a cloneable [`SettingsHandle`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use beacon_utils::{BeaconError, Result};

use crate::coerce::UpdateBatch;
use crate::fields::{apply_batch, ApplyReport};
use crate::record::{Settings, SettingsSnapshot};
use crate::store::SettingsStore;

/// Default number of requests that may queue before producers wait
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// One submitted batch and the channel its acknowledgment goes back on
#[derive(Debug)]
pub struct UpdateRequest {
    pub batch: UpdateBatch,
    ack: oneshot::Sender<ApplyReport>,
}

impl UpdateRequest {
    pub fn new(batch: UpdateBatch) -> (Self, oneshot::Receiver<ApplyReport>) {
        let (ack, rx) = oneshot::channel();
        (Self { batch, ack }, rx)
    }
}

/// Producer-side handle to the apply loop
///
/// Each clone is an independent producer stream. Batches submitted through
/// one handle by one task are applied in submission order.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    tx: mpsc::Sender<UpdateRequest>,
    snapshots: watch::Receiver<SettingsSnapshot>,
    settings: Arc<Settings>,
}

impl SettingsHandle {
    /// Submit a batch and wait until it has been applied and persisted
    ///
    /// Coercion and storage problems are reported in the returned
    /// [`ApplyReport`], never as errors. The only error is a stopped loop.
    /// Dropping the returned future abandons the wait without cancelling
    /// the apply.
    pub async fn submit(&self, batch: UpdateBatch) -> Result<ApplyReport> {
        let (request, ack) = UpdateRequest::new(batch);
        self.tx
            .send(request)
            .await
            .map_err(|_| BeaconError::LoopClosed)?;
        ack.await.map_err(|_| BeaconError::LoopClosed)
    }

    /// Watch the snapshot published after every apply
    pub fn subscribe(&self) -> watch::Receiver<SettingsSnapshot> {
        self.snapshots.clone()
    }

    /// The shared record, for direct accessor use
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Whether the loop has stopped accepting requests
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The single consumer of update requests
pub struct ApplyLoop {
    settings: Arc<Settings>,
    store: Arc<dyn SettingsStore>,
    rx: mpsc::Receiver<UpdateRequest>,
    snapshots: watch::Sender<SettingsSnapshot>,
}

impl ApplyLoop {
    /// Create a loop and the handle that feeds it
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<dyn SettingsStore>,
        capacity: usize,
    ) -> (SettingsHandle, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(settings.snapshot());

        let handle = SettingsHandle {
            tx,
            snapshots: snapshot_rx,
            settings: Arc::clone(&settings),
        };
        let apply_loop = Self {
            settings,
            store,
            rx,
            snapshots: snapshot_tx,
        };
        (handle, apply_loop)
    }

    /// Run until every handle has been dropped
    pub async fn run(mut self) {
        info!("Settings apply loop started");

        // Idle while waiting on recv, applying inside the body
        while let Some(UpdateRequest { batch, ack }) = self.rx.recv().await {
            let report = self.apply(&batch).await;
            if ack.send(report).is_err() {
                debug!("Producer stopped waiting for settings acknowledgment");
            }
        }

        info!("Settings apply loop stopped");
    }

    /// Apply one batch, persist, and publish the result
    async fn apply(&self, batch: &UpdateBatch) -> ApplyReport {
        let mut report = apply_batch(&self.settings, batch);
        report.persisted = self.persist().await;
        self.snapshots.send_replace(self.settings.snapshot());

        debug!(
            applied = ?report.applied,
            ignored = ?report.ignored,
            persisted = report.persisted,
            "Applied settings batch"
        );
        report
    }

    /// Save the record, reporting failures without propagating them
    async fn persist(&self) -> bool {
        let fields = self.settings.persisted();
        let store = Arc::clone(&self.store);

        match tokio::task::spawn_blocking(move || store.save(&fields)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to persist settings, keeping in-memory state");
                false
            }
            Err(e) => {
                error!(error = %e, "Settings save task failed");
                false
            }
        }
    }
}

/// Start the apply loop on the current tokio runtime
pub fn spawn(
    settings: Arc<Settings>,
    store: Arc<dyn SettingsStore>,
    capacity: usize,
) -> (SettingsHandle, JoinHandle<()>) {
    let (handle, apply_loop) = ApplyLoop::new(settings, store, capacity);
    (handle, tokio::spawn(apply_loop.run()))
}
