use common::ErrorLocation;

use std::panic::Location;

use models::{ErrorKind, ModelError};
use thiserror::Error as ThisError;

/// Failures reported by the command table and its handlers.
#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error("Unknown Command Error: {message} {location}")]
    UnknownCommand {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unsupported Error: {message} {location}")]
    Unsupported {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handler Error: {message} {location}")]
    Handler {
        message: String,
        location: ErrorLocation,
    },
}

impl CommandError {
    #[track_caller]
    pub fn handler(message: impl Into<String>) -> Self {
        CommandError::Handler {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            CommandError::Unsupported { .. } => ErrorKind::Unsupported,
            CommandError::Handler { .. } => ErrorKind::HandlerError,
        }
    }

    /// Message without the source location, as sent back over the channel.
    pub fn message(&self) -> &str {
        match self {
            CommandError::UnknownCommand { message, .. }
            | CommandError::Unsupported { message, .. }
            | CommandError::Handler { message, .. } => message,
        }
    }
}

impl From<ModelError> for CommandError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        CommandError::Handler {
            message: error.reason(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
