//! Wiring between the command line and bridge-core.

use crate::error::CadbridgeError;

use bridge_core::commands::CommandTable;
use bridge_core::config::{
    BackendMode, BridgeConfig, apply_env_overrides, default_config_dir, try_load_dotenv,
};
use bridge_core::selector::{BackendSelector, ChannelConnector};
use bridge_core::storage::IpcDirectory;
use bridge_core::trigger::{KeystrokeSink, NullSink, SignalSink};

use common::ErrorLocation;

use std::fs::OpenOptions;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use models::Params;
use serde_json::{Value, json};

/// Command run after `--capture` to describe the drawing.
pub const SNAPSHOT_COMMAND: &str = "drawing-info";

pub fn resolve_config_dir(overridden: Option<&Path>) -> PathBuf {
    overridden
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_dir)
}

/// Config file, then `.env` and `CADBRIDGE_*` variables, then the CLI flag.
pub fn load_config(
    config_dir: &Path,
    backend: Option<BackendMode>,
) -> Result<BridgeConfig, CadbridgeError> {
    try_load_dotenv();

    let mut config = BridgeConfig::load(config_dir)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    if let Some(backend) = backend {
        config.backend = backend;
    }

    debug!("Effective configuration: {config:?}");
    Ok(config)
}

/// Where keystrokes for the host console go.
///
/// Without a configured console the host is expected to poll on its own.
pub fn signal_sink(config: &BridgeConfig) -> Result<Arc<dyn SignalSink>, CadbridgeError> {
    let Some(path) = &config.host.console_path else {
        return Ok(Arc::new(NullSink));
    };

    let console = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CadbridgeError::Cadbridge {
            message: format!("Failed to open host console {}: {e}", path.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Sending keystrokes to {}", path.display());
    Ok(Arc::new(KeystrokeSink::new(console)))
}

pub fn build_selector(
    config: &BridgeConfig,
    table: Arc<CommandTable>,
) -> Result<BackendSelector, CadbridgeError> {
    // Headless never triggers the host, so the console is left alone
    let sink: Arc<dyn SignalSink> = match config.backend {
        BackendMode::Headless => Arc::new(NullSink),
        BackendMode::Auto | BackendMode::Live => signal_sink(config)?,
    };
    let connector = ChannelConnector::from_config(config, sink, table.clone());
    Ok(BackendSelector::new(
        config.backend,
        table,
        Arc::new(connector),
    ))
}

/// Apply a `--timeout` override to the live call timeout.
pub fn with_call_timeout(mut config: BridgeConfig, timeout: Option<Duration>) -> BridgeConfig {
    if let Some(timeout) = timeout {
        config.ipc.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }
    config
}

/// Run `command` and wrap the result in the success envelope.
pub async fn exec(
    selector: &BackendSelector,
    command: &str,
    params: &Params,
    capture: bool,
) -> Result<Value, CadbridgeError> {
    let payload = selector.execute(command, params).await?;
    let backend = selector.current_kind().await.map(|kind| kind.as_str());

    let mut envelope = json!({
        "ok": true,
        "command": command,
        "backend": backend,
        "payload": payload,
    });

    if capture {
        match selector.execute(SNAPSHOT_COMMAND, &Params::new()).await {
            Ok(snapshot) => envelope["snapshot"] = snapshot,
            Err(e) => warn!("Snapshot after '{command}' failed: {e}"),
        }
    }

    Ok(envelope)
}

pub fn failure_envelope(command: Option<&str>, error: &CadbridgeError) -> Value {
    json!({
        "ok": false,
        "command": command,
        "error_kind": error.kind().map(|kind| kind.as_str()),
        "error": error.to_string(),
    })
}

/// Name, availability and description of every whitelisted command.
pub fn describe_commands(table: &CommandTable) -> Value {
    let commands: Vec<Value> = table
        .entries()
        .map(|entry| {
            json!({
                "name": entry.name,
                "availability": entry.availability,
                "undoable": entry.undoable,
                "description": entry.description,
            })
        })
        .collect();

    json!({ "count": commands.len(), "commands": commands })
}

pub fn sweep(config: &BridgeConfig) -> Result<Value, CadbridgeError> {
    let directory = IpcDirectory::new(config.ipc_dir());
    if !directory.root().exists() {
        return Ok(json!({ "directory": directory.root().display().to_string(), "removed": 0 }));
    }

    let removed = directory
        .sweep_stale(config.stale_threshold())
        .map_err(|e| CadbridgeError::Cadbridge {
            message: format!("Failed to sweep {}: {e}", directory.root().display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(json!({ "directory": directory.root().display().to_string(), "removed": removed }))
}
