//! Core of the cadbridge workspace.
//!
//! A controller talks to a CAD host through a shared directory: it drops a
//! request artifact, pokes the host's console, and polls for the matching
//! response artifact. The host side runs a [`Dispatcher`](dispatcher::Dispatcher)
//! over a closed [`CommandTable`](commands::CommandTable). A
//! [`HeadlessEngine`](backend::headless::HeadlessEngine) executes the same
//! table against an in-memory document, and the
//! [`BackendSelector`](selector::BackendSelector) picks one of the two.

pub mod backend;
pub mod channel;
pub mod codec;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod host;
pub mod selector;
pub mod storage;
pub mod trigger;

#[cfg(test)]
mod tests;

pub use error::CoreError;

/// Common prefix of every artifact this crate writes to shared storage.
pub const ARTIFACT_PREFIX: &str = "cadbridge_";
pub const REQUEST_PREFIX: &str = const_format::concatcp!(ARTIFACT_PREFIX, "cmd_");
pub const RESPONSE_PREFIX: &str = const_format::concatcp!(ARTIFACT_PREFIX, "result_");
pub const SCRIPT_PREFIX: &str = const_format::concatcp!(ARTIFACT_PREFIX, "script_");

pub const ARTIFACT_SUFFIX: &str = ".json";
pub const SCRIPT_SUFFIX: &str = ".lsp";
pub const TEMP_SUFFIX: &str = ".tmp";

/// Console input that makes the host run one dispatcher activation.
pub const DISPATCH_PHRASE: &str = "(c:cadbridge-dispatch)";
