use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Missing Parameter Error: '{key}' is required {location}")]
    MissingParam {
        key: String,
        location: ErrorLocation,
    },

    #[error("Invalid Parameter Error: '{key}' must be {expected}, got {found} {location}")]
    InvalidParam {
        key: String,
        expected: &'static str,
        found: &'static str,
        location: ErrorLocation,
    },
}

impl ModelError {
    /// Message without the source location, suitable for a remote caller.
    pub fn reason(&self) -> String {
        match self {
            ModelError::Validation { message, .. } => message.clone(),
            ModelError::MissingParam { key, .. } => format!("parameter '{key}' is required"),
            ModelError::InvalidParam {
                key,
                expected,
                found,
                ..
            } => format!("parameter '{key}' must be {expected}, got {found}"),
        }
    }
}
