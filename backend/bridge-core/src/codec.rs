//! Encoding of requests and responses exchanged through shared storage.
//!
//! The wire form is a flat JSON object. Strings are escaped by the JSON
//! encoder (quotes, backslashes and control characters), floats are rounded
//! to [`FLOAT_DECIMALS`] fractional digits before rendering, and decoding
//! rejects anything that does not carry every field its shape requires.

use crate::error::codec::CodecError;

use common::ErrorLocation;

use std::panic::Location;

use models::{ErrorKind, Outcome, ParamValue, Params, Request, RequestId, Response};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// Fractional digits kept for every float crossing the channel.
pub const FLOAT_DECIMALS: i32 = 6;

pub trait Codec: Send + Sync {
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError>;

    fn decode_request(&self, bytes: &[u8]) -> Result<Request, CodecError>;

    fn encode_response(&self, response: &Response) -> Result<Vec<u8>, CodecError>;

    fn decode_response(&self, bytes: &[u8]) -> Result<Response, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[derive(Serialize, Deserialize)]
struct ResponseWire {
    request_id: RequestId,
    ok: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(default)]
    ts: u64,
}

/// Keeps an explicit `null` payload distinguishable from a missing one.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Codec for JsonCodec {
    #[track_caller]
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError> {
        let params = round_params(&request.params)?;
        let wire = Request {
            params,
            ..request.clone()
        };

        serde_json::to_vec(&wire).map_err(|e| CodecError::Encode {
            message: format!("Failed to encode request {}: {e}", request.request_id),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn decode_request(&self, bytes: &[u8]) -> Result<Request, CodecError> {
        let request: Request = serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed {
            message: format!("Failed to decode request: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if request.command.trim().is_empty() {
            return Err(CodecError::Malformed {
                message: format!("Request {} has an empty command", request.request_id),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(request)
    }

    #[track_caller]
    fn encode_response(&self, response: &Response) -> Result<Vec<u8>, CodecError> {
        let wire = match &response.outcome {
            Outcome::Success(payload) => ResponseWire {
                request_id: response.request_id.clone(),
                ok: true,
                payload: Some(round_value(payload.clone())),
                error: None,
                error_kind: None,
                ts: response.ts,
            },
            Outcome::Failure { kind, message } => ResponseWire {
                request_id: response.request_id.clone(),
                ok: false,
                payload: None,
                error: Some(message.clone()),
                error_kind: Some(*kind),
                ts: response.ts,
            },
        };

        serde_json::to_vec(&wire).map_err(|e| CodecError::Encode {
            message: format!("Failed to encode response {}: {e}", response.request_id),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn decode_response(&self, bytes: &[u8]) -> Result<Response, CodecError> {
        let wire: ResponseWire =
            serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed {
                message: format!("Failed to decode response: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let outcome = match (wire.ok, wire.payload, wire.error) {
            (true, Some(payload), None) => Outcome::Success(payload),
            (false, None, Some(message)) => Outcome::Failure {
                kind: wire.error_kind.unwrap_or(ErrorKind::HandlerError),
                message,
            },
            (true, None, _) => {
                return Err(CodecError::Malformed {
                    message: format!("Response {} is ok but has no payload", wire.request_id),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            (false, _, None) => {
                return Err(CodecError::Malformed {
                    message: format!("Response {} failed without an error", wire.request_id),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            (ok, _, _) => {
                return Err(CodecError::Malformed {
                    message: format!(
                        "Response {} carries both payload and error (ok={ok})",
                        wire.request_id
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        Ok(Response {
            request_id: wire.request_id,
            outcome,
            ts: wire.ts,
        })
    }
}

/// Round `value` to [`FLOAT_DECIMALS`] fractional digits.
///
/// Magnitudes where a float has no fractional digits at that precision are
/// returned unchanged, as are non-finite values.
pub fn round_float(value: f64) -> f64 {
    let scale = 10f64.powi(FLOAT_DECIMALS);
    if !value.is_finite() || value.abs() >= 2f64.powi(f64::MANTISSA_DIGITS as i32) / scale {
        return value;
    }

    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() { rounded } else { value }
}

#[track_caller]
fn round_params(params: &Params) -> Result<Params, CodecError> {
    params
        .iter()
        .map(|(key, value)| Ok((key.clone(), round_param(key, value)?)))
        .collect()
}

#[track_caller]
fn round_param(key: &str, value: &ParamValue) -> Result<ParamValue, CodecError> {
    match value {
        ParamValue::Float(number) if !number.is_finite() => Err(CodecError::Encode {
            message: format!("Parameter '{key}' is not a finite number: {number}"),
            location: ErrorLocation::from(Location::caller()),
        }),
        ParamValue::Float(number) => Ok(ParamValue::Float(round_float(*number))),
        ParamValue::List(items) => items
            .iter()
            .map(|item| round_param(key, item))
            .collect::<Result<Vec<_>, _>>()
            .map(ParamValue::List),
        ParamValue::Map(entries) => entries
            .iter()
            .map(|(name, item)| Ok((name.clone(), round_param(key, item)?)))
            .collect::<Result<_, CodecError>>()
            .map(ParamValue::Map),
        other => Ok(other.clone()),
    }
}

fn round_value(value: Value) -> Value {
    match value {
        Value::Number(number) if number.is_f64() => number
            .as_f64()
            .and_then(|float| Number::from_f64(round_float(float)))
            .map(Value::Number)
            .unwrap_or(Value::Number(number)),
        Value::Array(items) => Value::Array(items.into_iter().map(round_value).collect()),
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, item)| (key, round_value(item)))
                .collect(),
        ),
        other => other,
    }
}
