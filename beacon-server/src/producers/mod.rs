//! Update producers attached by the daemon

mod stdin;
mod watcher;

pub use stdin::{read_lines, run_json_lines};
pub use watcher::SettingsFileWatcher;
