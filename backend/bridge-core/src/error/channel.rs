use crate::error::codec::CodecError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use models::ErrorKind;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ChannelError {
    #[error("Channel IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ChannelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChannelError::Io { .. } => ErrorKind::ChannelIo,
            ChannelError::Timeout { .. } => ErrorKind::Timeout,
            ChannelError::Codec(_) => ErrorKind::MalformedPayload,
        }
    }
}

impl From<IoError> for ChannelError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        ChannelError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
