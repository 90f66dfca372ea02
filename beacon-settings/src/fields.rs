//! Field dispatch table
//!
//! Each entry ties a wire key to the accessor that applies it. Adding a
//! settings field means adding an accessor and one entry here.

use serde::Serialize;

use crate::coerce::{coerce, extract, FromUntyped, UpdateBatch};
use crate::record::Settings;

/// Wire keys understood by the apply loop
pub mod keys {
    pub const PROXY_ALL: &str = "proxyAll";
    pub const SYSTEM_PROXY: &str = "systemProxy";
    pub const AUTO_REPORT: &str = "autoReport";
    pub const AUTO_LAUNCH: &str = "autoLaunch";
    pub const USER_ID: &str = "userID";
    pub const USER_TOKEN: &str = "userToken";
    pub const DEVICE_ID: &str = "deviceID";
}

/// What happened to one field of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// The batch did not mention the field
    Absent,
    /// The value had the right type and was stored
    Applied,
    /// The value had the wrong type and was dropped
    Mismatched,
    /// The field cannot be changed through a batch
    ReadOnly,
}

/// A settings field reachable from update batches
pub struct Field {
    pub key: &'static str,
    apply: fn(&Settings, &UpdateBatch) -> FieldOutcome,
}

impl Field {
    pub fn apply(&self, settings: &Settings, batch: &UpdateBatch) -> FieldOutcome {
        (self.apply)(settings, batch)
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("key", &self.key).finish()
    }
}

pub static FIELDS: &[Field] = &[
    Field { key: keys::PROXY_ALL, apply: apply_proxy_all },
    Field { key: keys::SYSTEM_PROXY, apply: apply_system_proxy },
    Field { key: keys::AUTO_REPORT, apply: apply_auto_report },
    Field { key: keys::AUTO_LAUNCH, apply: apply_auto_launch },
    Field { key: keys::USER_ID, apply: apply_user_id },
    Field { key: keys::USER_TOKEN, apply: apply_user_token },
    Field { key: keys::DEVICE_ID, apply: reject_device_id },
];

/// Whether `key` names a known field
pub fn is_known(key: &str) -> bool {
    FIELDS.iter().any(|field| field.key == key)
}

fn apply_typed<T: FromUntyped>(
    batch: &UpdateBatch,
    key: &str,
    set: impl FnOnce(T),
) -> FieldOutcome {
    if !batch.contains_key(key) {
        FieldOutcome::Absent
    } else if coerce(batch, key, set) {
        FieldOutcome::Applied
    } else {
        FieldOutcome::Mismatched
    }
}

fn apply_proxy_all(settings: &Settings, batch: &UpdateBatch) -> FieldOutcome {
    apply_typed(batch, keys::PROXY_ALL, |v: bool| settings.set_proxy_all(v))
}

fn apply_system_proxy(settings: &Settings, batch: &UpdateBatch) -> FieldOutcome {
    apply_typed(batch, keys::SYSTEM_PROXY, |v: bool| settings.set_system_proxy(v))
}

fn apply_auto_report(settings: &Settings, batch: &UpdateBatch) -> FieldOutcome {
    apply_typed(batch, keys::AUTO_REPORT, |v: bool| settings.set_auto_report(v))
}

fn apply_auto_launch(settings: &Settings, batch: &UpdateBatch) -> FieldOutcome {
    apply_typed(batch, keys::AUTO_LAUNCH, |v: bool| settings.set_auto_launch(v))
}

fn apply_user_id(settings: &Settings, batch: &UpdateBatch) -> FieldOutcome {
    apply_typed(batch, keys::USER_ID, |v: i64| settings.set_user_id(v))
}

fn apply_user_token(settings: &Settings, batch: &UpdateBatch) -> FieldOutcome {
    apply_typed(batch, keys::USER_TOKEN, |v: String| settings.set_token(v))
}

/// The device ID is derived from the host, never taken from a batch
fn reject_device_id(settings: &Settings, batch: &UpdateBatch) -> FieldOutcome {
    if !batch.contains_key(keys::DEVICE_ID) {
        return FieldOutcome::Absent;
    }

    if let Some(proposed) = extract::<String>(batch, keys::DEVICE_ID) {
        let current = settings.device_id();
        if proposed != current {
            tracing::debug!(
                current = %current,
                proposed = %proposed,
                "Ignoring attempt to change device ID"
            );
        }
    }
    FieldOutcome::ReadOnly
}

/// Outcome of applying one batch, returned to the producer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Keys whose values were stored, in table order
    pub applied: Vec<String>,
    /// Keys that were present but dropped (wrong type, read-only, unknown)
    pub ignored: Vec<String>,
    /// Whether the record reached durable storage afterwards
    pub persisted: bool,
}

impl ApplyReport {
    /// True when the batch changed no field
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Run every field of the table against `batch`
///
/// Fields are stored one at a time; persistence is the caller's job.
pub fn apply_batch(settings: &Settings, batch: &UpdateBatch) -> ApplyReport {
    let mut report = ApplyReport::default();

    for field in FIELDS {
        match field.apply(settings, batch) {
            FieldOutcome::Absent => {}
            FieldOutcome::Applied => report.applied.push(field.key.to_string()),
            FieldOutcome::Mismatched | FieldOutcome::ReadOnly => {
                report.ignored.push(field.key.to_string())
            }
        }
    }

    for key in batch.keys().filter(|key| !is_known(key)) {
        tracing::trace!(key = %key, "Ignoring unknown settings key");
        report.ignored.push(key.clone());
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BuildInfo, PersistedSettings};
    use serde_json::{json, Value};

    fn batch(value: Value) -> UpdateBatch {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn settings() -> Settings {
        Settings::new(
            BuildInfo::default(),
            PersistedSettings {
                device_id: "original".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_every_field_has_unique_key() {
        let mut seen = std::collections::HashSet::new();
        for field in FIELDS {
            assert!(seen.insert(field.key), "duplicate key {}", field.key);
        }
        assert!(is_known(keys::DEVICE_ID));
        assert!(!is_known("version"));
    }

    #[test]
    fn test_mixed_batch() {
        let settings = settings();
        let report = apply_batch(
            &settings,
            &batch(json!({
                "autoReport": false,
                "proxyAll": true,
                "autoLaunch": false,
                "systemProxy": false,
                "deviceID": "8208fja09493",
                "userID": true,
                "userToken": true,
            })),
        );

        assert!(settings.proxy_all());
        assert!(!settings.system_proxy());
        assert!(!settings.auto_report());
        assert!(!settings.auto_launch());
        assert_eq!(settings.user_id(), 0);
        assert_eq!(settings.token(), "");
        assert_eq!(settings.device_id(), "original");

        assert_eq!(
            report.applied,
            vec!["proxyAll", "systemProxy", "autoReport", "autoLaunch"]
        );
        assert_eq!(report.ignored, vec!["userID", "userToken", "deviceID"]);
    }

    #[test]
    fn test_absent_fields_untouched() {
        let settings = settings();
        settings.set_user_id(9);
        settings.set_token("keep");

        let report = apply_batch(&settings, &batch(json!({ "proxyAll": true })));

        assert_eq!(settings.user_id(), 9);
        assert_eq!(settings.token(), "keep");
        assert_eq!(report.applied, vec!["proxyAll"]);
        assert!(report.ignored.is_empty());
    }

    #[test]
    fn test_unknown_keys_reported_not_applied() {
        let settings = settings();
        let before = settings.persisted();

        let report = apply_batch(&settings, &batch(json!({ "randomjfdklajfla": "fadldjfdla" })));

        assert_eq!(settings.persisted(), before);
        assert!(report.is_noop());
        assert_eq!(report.ignored, vec!["randomjfdklajfla"]);
    }

    #[test]
    fn test_device_id_non_string_is_read_only() {
        let settings = settings();
        let report = apply_batch(&settings, &batch(json!({ "deviceID": 12 })));
        assert_eq!(settings.device_id(), "original");
        assert_eq!(report.ignored, vec!["deviceID"]);
    }

    #[test]
    fn test_reapplying_is_idempotent() {
        let settings = settings();
        let b = batch(json!({ "proxyAll": true, "userID": 5, "userToken": "x" }));

        apply_batch(&settings, &b);
        let once = settings.persisted();
        apply_batch(&settings, &b);

        assert_eq!(settings.persisted(), once);
    }
}
