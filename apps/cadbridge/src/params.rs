//! Command-line parameter parsing.
//!
//! `--param key=value` infers the value type: `true`/`false`, integers,
//! finite floats and JSON lists or objects are typed, anything else is text.
//! Wrapping a value in double quotes forces text.

use crate::error::CadbridgeError;

use common::ErrorLocation;

use std::panic::Location;

use models::{ParamValue, Params};

/// Parse one `key=value` argument.
#[track_caller]
pub fn parse_param(argument: &str) -> Result<(String, ParamValue), CadbridgeError> {
    let Some((key, raw)) = argument.split_once('=') else {
        return Err(CadbridgeError::Params {
            message: format!("expected KEY=VALUE, got {argument:?}"),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(CadbridgeError::Params {
            message: format!("invalid parameter name {key:?}"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok((key.to_string(), parse_value(raw)))
}

pub fn parse_value(raw: &str) -> ParamValue {
    let trimmed = raw.trim();

    if let Some(text) = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return ParamValue::Text(text.to_string());
    }

    match trimmed {
        "true" => return ParamValue::Bool(true),
        "false" => return ParamValue::Bool(false),
        _ => {}
    }

    if let Ok(integer) = trimmed.parse::<i64>() {
        return ParamValue::Int(integer);
    }

    if let Ok(float) = trimmed.parse::<f64>()
        && float.is_finite()
    {
        return ParamValue::Float(float);
    }

    if (trimmed.starts_with('[') || trimmed.starts_with('{'))
        && let Ok(value) = serde_json::from_str::<ParamValue>(trimmed)
    {
        return value;
    }

    ParamValue::Text(raw.to_string())
}

/// Merge `--params-json` (applied first) with individual `--param` arguments.
#[track_caller]
pub fn build_params(arguments: &[String], json: Option<&str>) -> Result<Params, CadbridgeError> {
    let mut params = match json {
        Some(json) => serde_json::from_str::<Params>(json).map_err(|e| CadbridgeError::Params {
            message: format!("--params-json must be an object of parameters: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?,
        None => Params::new(),
    };

    for argument in arguments {
        let (key, value) = parse_param(argument)?;
        params.insert(key, value);
    }

    Ok(params)
}
