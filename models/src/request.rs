use crate::error::model_error::ModelError;
use crate::params::{ParamValue, Params};

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hex digits of creation time at the front of every id.
const TIMESTAMP_DIGITS: usize = 16;
/// Random hex digits after the timestamp.
const RANDOM_DIGITS: usize = 12;
pub const REQUEST_ID_LEN: usize = TIMESTAMP_DIGITS + RANDOM_DIGITS;

/// Opaque request token.
///
/// Lowercase hex: creation time in microseconds since the Unix epoch
/// (zero-padded to 16 digits) followed by 12 random digits. Lexicographic
/// order is creation order on a single clock.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        let random: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(RANDOM_DIGITS)
            .collect();

        Self(format!("{micros:016x}{random}"))
    }

    #[track_caller]
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let well_formed = raw.len() == REQUEST_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if !well_formed {
            return Err(ModelError::Validation {
                message: format!("Invalid request id: {raw:?}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time encoded in the id, in microseconds since the Unix epoch.
    pub fn created_micros(&self) -> u64 {
        self.0
            .get(..TIMESTAMP_DIGITS)
            .and_then(|digits| u64::from_str_radix(digits, 16).ok())
            .unwrap_or_default()
    }
}

impl TryFrom<String> for RequestId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestId> for String {
    fn from(value: RequestId) -> Self {
        value.0
    }
}

impl Display for RequestId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(&self.0)
    }
}

/// A single command invocation, as written to shared storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: RequestId,
    pub command: String,
    #[serde(default)]
    pub params: Params,
    /// Milliseconds since the Unix epoch at creation.
    #[serde(default)]
    pub ts: u64,
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Builder for validated [`Request`] values.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    request_id: Option<RequestId>,
    command: Option<String>,
    params: Params,
}

impl RequestBuilder {
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Build the request, generating an id when none was supplied.
    #[track_caller]
    pub fn build(self) -> Result<Request, ModelError> {
        let command = self.command.ok_or_else(|| ModelError::Validation {
            message: String::from("Command is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if command.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Command cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if command.chars().any(char::is_whitespace) {
            return Err(ModelError::Validation {
                message: format!("Command cannot contain whitespace: {command:?}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Request {
            request_id: self.request_id.unwrap_or_else(RequestId::generate),
            command,
            params: self.params,
            ts: now_millis(),
        })
    }
}
