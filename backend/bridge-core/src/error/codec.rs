use common::ErrorLocation;

use std::panic::Location;

use models::ModelError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Malformed Payload Error: {message} {location}")]
    Malformed {
        message: String,
        location: ErrorLocation,
    },
}

impl CodecError {
    pub fn message(&self) -> &str {
        match self {
            CodecError::Encode { message, .. } | CodecError::Malformed { message, .. } => message,
        }
    }
}

impl From<ModelError> for CodecError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        CodecError::Encode {
            message: error.reason(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
