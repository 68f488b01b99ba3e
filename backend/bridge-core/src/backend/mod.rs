//! The two engines behind `Execute(command, params)`.

pub mod headless;
pub mod live;

pub use headless::HeadlessEngine;
pub use live::LiveBackend;

use crate::error::CoreError;

use futures_util::future::BoxFuture;
use models::{BackendKind, Params};
use serde_json::Value;

/// One engine able to run whitelisted commands.
///
/// Both implementations check availability against the same command table
/// before doing anything, so an unsupported command fails identically on
/// either.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn execute<'a>(
        &'a self,
        command: &'a str,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Value, CoreError>>;

    /// Whether the engine can still take commands.
    fn health(&self) -> BoxFuture<'_, bool>;
}
