use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SelectorError {
    #[error("Backend Init Error: {message} {location}")]
    InitFailure {
        message: String,
        location: ErrorLocation,
    },
}
