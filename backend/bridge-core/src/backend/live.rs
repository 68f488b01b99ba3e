use crate::backend::Backend;
use crate::channel::Channel;
use crate::commands::{CommandTable, EXECUTE_SCRIPT};
use crate::error::CoreError;
use crate::error::channel::ChannelError;
use crate::error::codec::CodecError;
use crate::error::command::CommandError;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use log::{debug, warn};
use models::{BackendKind, ErrorKind, Params, RequestBuilder, RequestId};
use serde_json::Value;

pub const PING: &str = "ping";

/// Runs commands inside a host application through a [`Channel`].
pub struct LiveBackend {
    channel: Channel,
    table: Arc<CommandTable>,
    call_timeout: Duration,
    probe_timeout: Duration,
}

impl LiveBackend {
    pub fn new(
        channel: Channel,
        table: Arc<CommandTable>,
        call_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            table,
            call_timeout,
            probe_timeout,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Round-trip a `ping` within the probe timeout.
    pub async fn ping(&self) -> Result<Value, CoreError> {
        self.round_trip(PING, &Params::new(), self.probe_timeout)
            .await
    }

    /// Run `command` with an explicit timeout instead of the configured one.
    pub async fn execute_with_timeout(
        &self,
        command: &str,
        params: &Params,
        timeout: Duration,
    ) -> Result<Value, CoreError> {
        self.table.check(command, BackendKind::Live)?;

        if command == EXECUTE_SCRIPT && params.contains("code") {
            return self.execute_staged_script(params, timeout).await;
        }

        self.round_trip(command, params, timeout).await
    }

    async fn round_trip(
        &self,
        command: &str,
        params: &Params,
        timeout: Duration,
    ) -> Result<Value, CoreError> {
        let response = self.channel.call(command, params, timeout).await?;
        response.into_result().map_err(remote_error)
    }

    /// Write inline `code` to a script artifact and send its path instead.
    async fn execute_staged_script(
        &self,
        params: &Params,
        timeout: Duration,
    ) -> Result<Value, CoreError> {
        let code = params.require_str("code").map_err(CommandError::from)?;

        let request_id = RequestId::generate();
        let directory = self.channel.directory();
        let script_path = directory.script_path(&request_id);

        directory
            .ensure_exists()
            .and_then(|()| directory.write_atomic(&script_path, code.as_bytes()))
            .map_err(ChannelError::from)?;
        debug!("Staged script {} ({} bytes)", script_path.display(), code.len());

        let mut forwarded = params.clone();
        forwarded.remove("code");
        forwarded.insert("code_file", script_path.display().to_string());

        let request = RequestBuilder::default()
            .with_request_id(request_id)
            .with_command(EXECUTE_SCRIPT)
            .with_params(forwarded)
            .build()
            .map_err(CodecError::from)?;

        let response = self
            .channel
            .send(request, timeout, vec![script_path])
            .await?;
        response.into_result().map_err(remote_error)
    }
}

/// Rebuild a typed error from a failure reported by the host.
#[track_caller]
fn remote_error((kind, message): (ErrorKind, String)) -> CoreError {
    let location = ErrorLocation::from(Location::caller());

    match kind {
        ErrorKind::UnknownCommand => CommandError::UnknownCommand { message, location }.into(),
        ErrorKind::Unsupported => CommandError::Unsupported { message, location }.into(),
        ErrorKind::MalformedPayload => CodecError::Malformed { message, location }.into(),
        ErrorKind::HandlerError => CommandError::Handler { message, location }.into(),
        other => {
            warn!("Host reported unexpected error kind {other}: {message}");
            CommandError::Handler { message, location }.into()
        }
    }
}

impl Backend for LiveBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Live
    }

    fn execute<'a>(
        &'a self,
        command: &'a str,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Value, CoreError>> {
        self.execute_with_timeout(command, params, self.call_timeout)
            .boxed()
    }

    fn health(&self) -> BoxFuture<'_, bool> {
        async move {
            match self.ping().await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Live backend failed its health check: {e}");
                    false
                }
            }
        }
        .boxed()
    }
}
