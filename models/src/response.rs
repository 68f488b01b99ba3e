use crate::request::{RequestId, now_millis};

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-checkable failure category carried by every error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A request or response could not be decoded.
    MalformedPayload,
    /// The command is not in the whitelist.
    UnknownCommand,
    /// The command exists but not on this backend.
    Unsupported,
    /// The handler ran and reported a failure.
    HandlerError,
    /// No response arrived within the bound.
    Timeout,
    /// Shared storage could not be read or written.
    ChannelIo,
    /// Backend construction failed.
    InitFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedPayload => "MalformedPayload",
            ErrorKind::UnknownCommand => "UnknownCommand",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::HandlerError => "HandlerError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ChannelIo => "ChannelIo",
            ErrorKind::InitFailure => "InitFailure",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure { kind: ErrorKind, message: String },
}

/// The host's answer to exactly one [`Request`](crate::Request).
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub request_id: RequestId,
    pub outcome: Outcome,
    /// Milliseconds since the Unix epoch at creation.
    pub ts: u64,
}

impl Response {
    pub fn success(request_id: RequestId, payload: Value) -> Self {
        Self {
            request_id,
            outcome: Outcome::Success(payload),
            ts: now_millis(),
        }
    }

    pub fn failure(request_id: RequestId, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            request_id,
            outcome: Outcome::Failure {
                kind,
                message: message.into(),
            },
            ts: now_millis(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success(payload) => Some(payload),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure { message, .. } => Some(message),
        }
    }

    pub fn into_result(self) -> Result<Value, (ErrorKind, String)> {
        match self.outcome {
            Outcome::Success(payload) => Ok(payload),
            Outcome::Failure { kind, message } => Err((kind, message)),
        }
    }
}
