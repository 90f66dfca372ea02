//! JSON-lines producer
//!
//! Each input line holding a JSON object is submitted as one update batch.
//! After the acknowledgment arrives, the report and the resulting settings
//! are written back as one JSON line.
//!
//! Input is read on a plain OS thread. A read blocked on stdin never holds
//! up runtime shutdown that way.

use std::io::BufRead;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use beacon_settings::{ApplyReport, SettingsHandle, SettingsSnapshot};
use beacon_utils::{BeaconError, Result};

/// Line written for every applied batch
#[derive(Debug, Serialize)]
struct Acknowledgment<'a> {
    report: &'a ApplyReport,
    settings: &'a SettingsSnapshot,
}

/// Forward lines from `input` on a background thread
///
/// The channel closes at EOF or on the first read error.
pub fn read_lines<R>(input: R) -> Result<mpsc::UnboundedReceiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("beacon-stdin".into())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Stopped reading update lines");
                        break;
                    }
                }
            }
        })?;

    Ok(rx)
}

/// Submit batches from `lines` until the channel closes
///
/// Returns the number of batches applied. Lines that are not JSON objects
/// are logged and skipped.
pub async fn run_json_lines<W>(
    handle: SettingsHandle,
    mut lines: mpsc::UnboundedReceiver<String>,
    mut output: W,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut applied = 0;
    let mut line_no = 0usize;

    while let Some(line) = lines.recv().await {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let batch = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(batch)) => batch,
            Ok(other) => {
                warn!(line = line_no, "Skipping non-object update ({})", type_label(&other));
                continue;
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed update");
                continue;
            }
        };

        let report = handle.submit(batch).await?;
        let snapshot = handle.settings().snapshot();
        let ack = Acknowledgment {
            report: &report,
            settings: &snapshot,
        };

        let mut encoded =
            serde_json::to_vec(&ack).map_err(|e| BeaconError::serialization(e.to_string()))?;
        encoded.push(b'\n');
        output.write_all(&encoded).await?;
        output.flush().await?;

        applied += 1;
        debug!(line = line_no, "Acknowledged update from stdin");
    }

    Ok(applied)
}

fn type_label(value: &Value) -> &'static str {
    beacon_settings::coerce::json_type_name(value)
}
