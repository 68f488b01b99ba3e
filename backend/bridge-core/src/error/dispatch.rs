use crate::error::codec::CodecError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use models::ErrorKind;
use thiserror::Error as ThisError;

/// Failures that stop an activation before a response could be written.
#[derive(Debug, ThisError)]
pub enum DispatchError {
    #[error("Dispatch IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Io { .. } => ErrorKind::ChannelIo,
            DispatchError::Codec(_) => ErrorKind::MalformedPayload,
        }
    }
}

impl From<IoError> for DispatchError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        DispatchError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
