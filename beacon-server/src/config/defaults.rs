//! Default configuration values
//!
//! Printed by `beacon-server --print-default-config`.

pub const DEFAULT_CONFIG_TOML: &str = r##"
# beacon configuration

[settings]
# path = "~/.local/share/beacon/settings.yaml"
queue_capacity = 64
watch_file = true
read_stdin = true

[logging]
filter = "info"
output = "stderr"
"##;
