//! beacon server - settings synchronization daemon
//!
//! Owns the process-wide settings record, runs the apply loop and attaches
//! the configured producers.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use beacon_settings::{
    BuildInfo, DeviceIdentity, FixedIdentity, MachineIdentity, Settings, YamlFileStore,
};
use beacon_utils::{init_logging_with_config, BeaconError, LogConfig, Result};

mod cli;
mod config;
mod producers;

use cli::Args;
use config::{ConfigLoader, ServerConfig, DEFAULT_CONFIG_TOML};
use producers::{read_lines, run_json_lines, SettingsFileWatcher};

fn build_info() -> BuildInfo {
    BuildInfo::new(
        env!("CARGO_PKG_VERSION"),
        option_env!("BEACON_REVISION_DATE").unwrap_or("unknown"),
        option_env!("BEACON_BUILD_DATE").unwrap_or("unknown"),
    )
}

async fn run_daemon(config: ServerConfig, device_id: Option<String>) -> Result<()> {
    let path = config.settings.resolved_path();
    let store = Arc::new(YamlFileStore::new(&path));

    let identity: Box<dyn DeviceIdentity> = match device_id {
        Some(id) => Box::new(FixedIdentity::new(id)),
        None => Box::new(MachineIdentity),
    };

    let settings = Arc::new(Settings::load(build_info(), store.as_ref(), identity.as_ref())?);
    info!(
        path = %path.display(),
        version = %settings.version(),
        device_id = %settings.device_id(),
        "Settings loaded"
    );

    let (handle, apply_task) =
        beacon_settings::spawn(settings, store.clone(), config.settings.queue_capacity);

    let mut producers = JoinSet::new();

    if config.settings.watch_file {
        match SettingsFileWatcher::new(store) {
            Ok(watcher) => {
                producers.spawn(watcher.run(handle.clone()));
            }
            Err(e) => warn!("Settings file watcher disabled: {}", e),
        }
    }

    if config.settings.read_stdin {
        let lines = read_lines(std::io::BufReader::new(std::io::stdin()))?;
        let handle = handle.clone();
        producers.spawn(async move {
            match run_json_lines(handle, lines, tokio::io::stdout()).await {
                Ok(count) => info!(batches = count, "Stdin closed"),
                Err(e) => error!("Stdin producer failed: {}", e),
            }
        });
    }

    if producers.is_empty() {
        warn!("No producers enabled, nothing will update the settings");
    }

    // The loop stops once every producer handle is gone
    drop(handle);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        _ = async { while producers.join_next().await.is_some() {} } => {
            info!("All producers finished");
        }
    }

    producers.shutdown().await;
    apply_task
        .await
        .map_err(|e| BeaconError::internal(format!("Apply loop panicked: {}", e)))?;

    info!("Shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if args.print_default_config {
        print!("{}", DEFAULT_CONFIG_TOML);
        return Ok(());
    }

    let config = ConfigLoader::load_and_validate(args.config.as_deref())?;
    let config = args.apply_overrides(config);

    init_logging_with_config(
        LogConfig::daemon()
            .with_filter(config.logging.filter.clone())
            .with_output(config.logging.output.into()),
    )?;

    run_daemon(config, args.device_id).await
}
