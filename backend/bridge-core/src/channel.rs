//! Caller side of the file protocol.
//!
//! `call` publishes a request, fires the trigger once and polls for the
//! response with the same id. The request artifact is withdrawn when the
//! call ends for any reason, including the future being dropped, so a host
//! that wakes up late never runs a command nobody is waiting for.

use crate::codec::{Codec, JsonCodec};
use crate::error::channel::ChannelError;
use crate::storage::{IpcDirectory, temp_path_for};
use crate::trigger::Trigger;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use models::{Params, Request, RequestBuilder, RequestId, Response};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Channel {
    directory: IpcDirectory,
    codec: Arc<dyn Codec>,
    trigger: Trigger,
    poll_interval: Duration,
    in_flight: Mutex<()>,
}

/// Removes the artifacts of one call when dropped.
struct CallArtifacts<'a> {
    directory: &'a IpcDirectory,
    paths: Vec<PathBuf>,
}

impl Drop for CallArtifacts<'_> {
    fn drop(&mut self) {
        for path in &self.paths {
            match self.directory.remove_quiet(path) {
                Ok(true) => trace!("Withdrew {}", path.display()),
                Ok(false) => {}
                Err(e) => warn!("Failed to remove {}: {e}", path.display()),
            }
        }
    }
}

impl Channel {
    pub fn new(directory: IpcDirectory, trigger: Trigger) -> Self {
        Self {
            directory,
            codec: Arc::new(JsonCodec),
            trigger,
            poll_interval: DEFAULT_POLL_INTERVAL,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn directory(&self) -> &IpcDirectory {
        &self.directory
    }

    /// Send `command` and wait up to `timeout` for its response.
    pub async fn call(
        &self,
        command: &str,
        params: &Params,
        timeout: Duration,
    ) -> Result<Response, ChannelError> {
        let request = RequestBuilder::default()
            .with_command(command)
            .with_params(params.clone())
            .build()
            .map_err(|e| ChannelError::Codec(e.into()))?;

        self.send(request, timeout, Vec::new()).await
    }

    /// Send a prepared request. `attachments` are extra artifacts (such as a
    /// staged script) removed together with the request when the call ends.
    pub async fn send(
        &self,
        request: Request,
        timeout: Duration,
        attachments: Vec<PathBuf>,
    ) -> Result<Response, ChannelError> {
        let _slot = self.in_flight.lock().await;

        let request_id = request.request_id.clone();
        let request_path = self.directory.request_path(&request_id);
        let response_path = self.directory.response_path(&request_id);

        let mut paths = vec![
            request_path.clone(),
            temp_path_for(&request_path),
            response_path.clone(),
        ];
        paths.extend(attachments);
        let _artifacts = CallArtifacts {
            directory: &self.directory,
            paths,
        };

        let bytes = self.codec.encode_request(&request)?;
        self.directory.ensure_exists()?;
        self.directory.write_atomic(&request_path, &bytes)?;
        debug!("Published request {request_id} '{}'", request.command);

        if let Err(e) = self.trigger.fire().await {
            warn!("Trigger failed for {request_id}, still polling: {e}");
        }

        let response = self
            .await_response(&request_id, &response_path, timeout)
            .await?;
        debug!(
            "Received response {request_id} (ok={}) for '{}'",
            response.is_ok(),
            request.command
        );
        Ok(response)
    }

    async fn await_response(
        &self,
        request_id: &RequestId,
        response_path: &Path,
        timeout: Duration,
    ) -> Result<Response, ChannelError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(bytes) = self.directory.read_if_present(response_path)? {
                let response = self.codec.decode_response(&bytes)?;
                if &response.request_id == request_id {
                    return Ok(response);
                }
                debug!(
                    "Ignoring response for {} while waiting for {request_id}",
                    response.request_id
                );
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ChannelError::Timeout {
                    message: format!(
                        "no response to {request_id} within {}",
                        humantime::format_duration(timeout)
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
