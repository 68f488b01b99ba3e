use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TriggerError {
    #[error("Trigger Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IoError> for TriggerError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        TriggerError::Send {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
