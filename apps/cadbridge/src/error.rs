use bridge_core::CoreError;
use bridge_core::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;

use models::ErrorKind;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the command-line front end.
///
/// Serialized into the JSON failure envelope printed on stdout, so callers
/// scripting the CLI can branch on `type` and `kind`.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CadbridgeError {
    /// Error from this App
    #[error("Cadbridge Error: {message} {location}")]
    Cadbridge {
        message: String,
        location: ErrorLocation,
    },

    /// Error from bridge-core (channel, dispatcher, backends, config)
    #[error("Core Error: {message} {location}")]
    Core {
        kind: ErrorKind,
        message: String,
        location: ErrorLocation,
    },

    /// A `--param` or `--params-json` argument could not be parsed
    #[error("Params Error: {message} {location}")]
    Params {
        message: String,
        location: ErrorLocation,
    },
}

impl CadbridgeError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CadbridgeError::Core { kind, .. } => Some(*kind),
            CadbridgeError::Cadbridge { .. } | CadbridgeError::Params { .. } => None,
        }
    }
}

impl From<CoreError> for CadbridgeError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        CadbridgeError::Core {
            kind: error.kind(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for CadbridgeError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        let error = CoreError::from(error);
        CadbridgeError::Core {
            kind: error.kind(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
