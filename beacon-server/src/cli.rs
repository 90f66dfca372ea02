//! Command-line argument parsing for the beacon daemon

use clap::Parser;
use std::path::PathBuf;

use crate::config::ServerConfig;

/// beacon - settings synchronization daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Daemon configuration file (defaults to the XDG config dir)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Persisted settings file, overriding the configuration
    #[arg(long, short = 's', env = "BEACON_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Do not apply hand edits of the settings file
    #[arg(long, default_value_t = false)]
    pub no_watch: bool,

    /// Do not read JSON-lines updates from stdin
    #[arg(long, default_value_t = false)]
    pub no_stdin: bool,

    /// Use this device ID instead of deriving one from the host
    ///
    /// Only consulted when no device ID has been persisted yet.
    #[arg(long)]
    pub device_id: Option<String>,

    /// Log filter, e.g. "debug" or "beacon_settings=trace"
    #[arg(long, env = "BEACON_LOG")]
    pub log: Option<String>,

    /// Print the default configuration and exit
    #[arg(long, default_value_t = false)]
    pub print_default_config: bool,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply flag overrides on top of the loaded configuration
    pub fn apply_overrides(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(path) = &self.settings {
            config.settings.path = Some(path.clone());
        }
        if self.no_watch {
            config.settings.watch_file = false;
        }
        if self.no_stdin {
            config.settings.read_stdin = false;
        }
        if let Some(filter) = &self.log {
            config.logging.filter = filter.clone();
        }
        config
    }
}
