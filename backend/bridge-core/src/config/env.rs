use crate::config::{BackendMode, BridgeConfig};
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};

pub const ENV_BACKEND: &str = "CADBRIDGE_BACKEND";
pub const ENV_IPC_DIR: &str = "CADBRIDGE_IPC_DIR";
pub const ENV_IPC_TIMEOUT: &str = "CADBRIDGE_IPC_TIMEOUT";
pub const ENV_ONLY_TEXT: &str = "CADBRIDGE_ONLY_TEXT";
pub const ENV_ALLOW_SCRIPTS: &str = "CADBRIDGE_ALLOW_SCRIPTS";
pub const ENV_HOST_PROCESS: &str = "CADBRIDGE_HOST_PROCESS";
pub const ENV_HOST_CONSOLE: &str = "CADBRIDGE_HOST_CONSOLE";

/// Apply `CADBRIDGE_*` overrides read through `lookup`.
///
/// `lookup` is normally `|key| std::env::var(key).ok()`; tests pass a map.
/// The result is validated again after the overrides are applied.
pub fn apply_env_overrides(
    config: &mut BridgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(ENV_BACKEND) {
        config.backend = value
            .parse::<BackendMode>()
            .map_err(|reason| invalid(ENV_BACKEND, reason))?;
    }

    if let Some(value) = lookup(ENV_IPC_DIR).filter(|value| !value.trim().is_empty()) {
        config.ipc.dir = Some(PathBuf::from(value));
    }

    if let Some(value) = lookup(ENV_IPC_TIMEOUT) {
        let timeout = parse_timeout(&value).map_err(|reason| invalid(ENV_IPC_TIMEOUT, reason))?;
        config.ipc.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }

    if let Some(value) = lookup(ENV_ONLY_TEXT) {
        config.feedback.only_text =
            parse_flag(&value).map_err(|reason| invalid(ENV_ONLY_TEXT, reason))?;
    }

    if let Some(value) = lookup(ENV_ALLOW_SCRIPTS) {
        config.host.allow_scripts =
            parse_flag(&value).map_err(|reason| invalid(ENV_ALLOW_SCRIPTS, reason))?;
    }

    if let Some(value) = lookup(ENV_HOST_PROCESS) {
        config.host.process_name = Some(value).filter(|value| !value.trim().is_empty());
    }

    if let Some(value) = lookup(ENV_HOST_CONSOLE) {
        config.host.console_path = Some(value)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
    }

    debug!("Effective backend mode after environment: {}", config.backend);
    config.validate()
}

/// `"5s"`, `"1500ms"` or a bare number of seconds.
fn parse_timeout(value: &str) -> Result<Duration, String> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds)
            .map_err(|e| format!("invalid timeout {value:?}: {e}"));
    }

    humantime::parse_duration(value).map_err(|e| format!("invalid timeout {value:?}: {e}"))
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("expected a boolean, got {other:?}")),
    }
}

#[track_caller]
fn invalid(key: &str, reason: String) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: format!("{key}: {reason}"),
    }
}

/// Load `.env` from the working directory, then from next to the executable.
///
/// Returns the file that was loaded, if any.
pub fn try_load_dotenv() -> Option<PathBuf> {
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded .env from: {}", path.display());
        return Some(path);
    }

    let env_path = std::env::current_exe()
        .ok()?
        .parent()?
        .join(".env");

    if !env_path.exists() {
        return None;
    }

    match dotenvy::from_path(&env_path) {
        Ok(()) => {
            info!("Loaded .env from: {}", env_path.display());
            Some(env_path)
        }
        Err(e) => {
            warn!("Failed to parse .env at {}: {e}", env_path.display());
            None
        }
    }
}
