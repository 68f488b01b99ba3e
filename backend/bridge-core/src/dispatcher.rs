//! Host-side request processing.
//!
//! Each activation walks `Discover → Parse → Lookup → Execute → WriteResult
//! → Cleanup` for at most one request, the oldest one published. Bad
//! requests, unknown commands and failing handlers all end in an error
//! response; only storage failures end the activation with an error.

use crate::codec::{Codec, JsonCodec};
use crate::commands::CommandTable;
use crate::error::dispatch::DispatchError;
use crate::host::LiveHost;
use crate::storage::IpcDirectory;

use std::sync::Arc;

use log::{debug, info, warn};
use models::{ErrorKind, Request, RequestId, Response};

/// Result of one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// No request was pending.
    Idle,
    /// One request was consumed and answered.
    Answered {
        request_id: RequestId,
        command: Option<String>,
        ok: bool,
    },
}

pub struct Dispatcher<H: LiveHost> {
    directory: IpcDirectory,
    codec: Arc<dyn Codec>,
    table: Arc<CommandTable>,
    host: H,
}

impl<H: LiveHost> Dispatcher<H> {
    pub fn new(directory: IpcDirectory, table: Arc<CommandTable>, host: H) -> Self {
        Self {
            directory,
            codec: Arc::new(JsonCodec),
            table,
            host,
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn directory(&self) -> &IpcDirectory {
        &self.directory
    }

    /// Process the oldest pending request, if any.
    pub fn activate(&mut self) -> Result<Activation, DispatchError> {
        let Some(request_id) = self.directory.pending_requests()?.into_iter().next() else {
            debug!("Dispatcher activated with nothing pending");
            return Ok(Activation::Idle);
        };

        let request_path = self.directory.request_path(&request_id);
        let Some(bytes) = self.directory.read_if_present(&request_path)? else {
            debug!("Request {request_id} withdrawn before it was read");
            return Ok(Activation::Idle);
        };

        let (command, response) = match self.parse(&request_id, &bytes) {
            Ok(request) => {
                let response = self.execute(&request);
                (Some(request.command), response)
            }
            Err(response) => (None, response),
        };

        let ok = response.is_ok();
        let encoded = self.codec.encode_response(&response)?;
        self.directory
            .write_atomic(&self.directory.response_path(&request_id), &encoded)?;
        self.directory.remove_quiet(&request_path)?;

        match (&command, ok) {
            (Some(command), true) => info!("Request {request_id} '{command}' succeeded"),
            (Some(command), false) => warn!(
                "Request {request_id} '{command}' failed: {}",
                response.error_message().unwrap_or_default()
            ),
            (None, _) => warn!("Request {request_id} rejected as malformed"),
        }

        Ok(Activation::Answered {
            request_id,
            command,
            ok,
        })
    }

    /// Run activations until nothing is pending; returns how many requests were answered.
    pub fn drain(&mut self) -> Result<usize, DispatchError> {
        let mut answered = 0;
        while let Activation::Answered { .. } = self.activate()? {
            answered += 1;
        }
        Ok(answered)
    }

    fn parse(&self, request_id: &RequestId, bytes: &[u8]) -> Result<Request, Response> {
        let request = self.codec.decode_request(bytes).map_err(|e| {
            Response::failure(request_id.clone(), ErrorKind::MalformedPayload, e.message())
        })?;

        if &request.request_id != request_id {
            return Err(Response::failure(
                request_id.clone(),
                ErrorKind::MalformedPayload,
                format!(
                    "request id {} does not match its artifact {request_id}",
                    request.request_id
                ),
            ));
        }

        Ok(request)
    }

    fn execute(&mut self, request: &Request) -> Response {
        match self
            .table
            .execute_on_host(&request.command, &mut self.host, &request.params)
        {
            Ok(payload) => Response::success(request.request_id.clone(), payload),
            Err(e) => Response::failure(request.request_id.clone(), e.kind(), e.message()),
        }
    }
}
