pub mod channel;
pub mod codec;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod selector;
pub mod trigger;

use models::ErrorKind;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Codec(#[from] codec::CodecError),

    #[error(transparent)]
    Channel(#[from] channel::ChannelError),

    #[error(transparent)]
    Command(#[from] command::CommandError),

    #[error(transparent)]
    Trigger(#[from] trigger::TriggerError),

    #[error(transparent)]
    Dispatch(#[from] dispatch::DispatchError),

    #[error(transparent)]
    Selector(#[from] selector::SelectorError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl CoreError {
    /// Machine-checkable category of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Codec(_) => ErrorKind::MalformedPayload,
            CoreError::Channel(error) => error.kind(),
            CoreError::Command(error) => error.kind(),
            CoreError::Trigger(_) => ErrorKind::ChannelIo,
            CoreError::Dispatch(error) => error.kind(),
            CoreError::Selector(_) | CoreError::Config(_) => ErrorKind::InitFailure,
        }
    }
}
