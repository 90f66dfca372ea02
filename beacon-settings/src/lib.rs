//! beacon-settings: process-wide settings record with an async apply loop
//!
//! - [`Settings`]: the typed record, shared as `Arc<Settings>`, with one
//!   locked getter/setter per field
//! - [`coerce`]: total, type-checked extraction from untyped batches
//! - [`fields`]: the table mapping wire keys to accessors
//! - [`sync`]: the serialized apply loop and its producer handle
//! - [`store`] / [`identity`]: persistence and device identity seams

pub mod coerce;
pub mod fields;
pub mod identity;
pub mod record;
pub mod store;
pub mod sync;

pub use coerce::{coerce, extract, FromUntyped, UpdateBatch};
pub use fields::{apply_batch, keys, ApplyReport, FieldOutcome, FIELDS};
pub use identity::{DeviceIdentity, FixedIdentity, MachineIdentity};
pub use record::{BuildInfo, PersistedSettings, Settings, SettingsSnapshot};
pub use store::{FileState, MemoryStore, SettingsStore, YamlFileStore};
pub use sync::{spawn, ApplyLoop, SettingsHandle, UpdateRequest, DEFAULT_QUEUE_CAPACITY};
