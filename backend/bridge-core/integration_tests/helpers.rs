//! Test helpers for the bridge integration tests.
//!
//! An "embedded" host is a simulated CAD application whose console is wired
//! straight into a dispatcher, so a trigger firing runs the activation
//! in-process before the channel starts polling.

use bridge_core::backend::LiveBackend;
use bridge_core::channel::Channel;
use bridge_core::codec::{Codec, JsonCodec};
use bridge_core::commands::CommandTable;
use bridge_core::dispatcher::Dispatcher;
use bridge_core::host::{EmbeddedHost, SimulatedHost};
use bridge_core::storage::IpcDirectory;
use bridge_core::trigger::{KeystrokeSink, SignalSink, Trigger};

use std::sync::Arc;
use std::time::Duration;

use models::{Params, Request, RequestBuilder};
use tempfile::TempDir;

pub type EmbeddedSink = KeystrokeSink<EmbeddedHost<SimulatedHost>>;

pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Test helper: Fresh shared directory.
pub fn shared_directory() -> (TempDir, IpcDirectory) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let directory = IpcDirectory::new(temp.path());
    (temp, directory)
}

/// Test helper: In-process host answering on `directory`.
pub fn embedded_sink(directory: &IpcDirectory, table: Arc<CommandTable>) -> Arc<EmbeddedSink> {
    let dispatcher = Dispatcher::new(directory.clone(), table, SimulatedHost::new());
    Arc::new(KeystrokeSink::new(EmbeddedHost::new(dispatcher)))
}

/// Test helper: Channel on `directory` with a fast poll and no settle delay.
pub fn channel_over(directory: &IpcDirectory, sink: Arc<dyn SignalSink>) -> Channel {
    let trigger = Trigger::new(sink).with_settle_delay(Duration::ZERO);
    Channel::new(directory.clone(), trigger).with_poll_interval(TEST_POLL_INTERVAL)
}

/// Test helper: Live backend talking to an embedded host.
pub fn embedded_live_backend(
    directory: &IpcDirectory,
    table: Arc<CommandTable>,
) -> (LiveBackend, Arc<EmbeddedSink>) {
    let sink = embedded_sink(directory, table.clone());
    let channel = channel_over(directory, sink.clone());
    let backend = LiveBackend::new(channel, table, TEST_TIMEOUT, TEST_TIMEOUT);
    (backend, sink)
}

/// Test helper: Build a request the way a controller would.
pub fn request(command: &str, params: Params) -> Request {
    RequestBuilder::default()
        .with_command(command)
        .with_params(params)
        .build()
        .expect("Failed to build request")
}

/// Test helper: Publish `request` as if a controller had written it.
pub fn publish(directory: &IpcDirectory, request: &Request) {
    let bytes = JsonCodec
        .encode_request(request)
        .expect("Failed to encode request");
    directory
        .write_atomic(&directory.request_path(&request.request_id), &bytes)
        .expect("Failed to publish request");
}

/// Test helper: Names of every file left in `directory`.
pub fn leftover_files(directory: &IpcDirectory) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(directory.root())
        .expect("Failed to list directory")
        .map(|entry| {
            entry
                .expect("Failed to read entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

pub fn line_params() -> Params {
    Params::new()
        .with("x1", 0.0)
        .with("y1", 0.0)
        .with("x2", 10.0)
        .with("y2", 0.0)
}
