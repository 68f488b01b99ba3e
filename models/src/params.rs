//! Command parameters.
//!
//! Parameters are a flat map of scalar values, with one level of lists and
//! maps for point lists and block attributes. An absent key is always
//! reported as `None` by the `optional_*` accessors and never collapses to a
//! zero value, so a caller-supplied `0.0` stays distinguishable from "not
//! provided".

use crate::error::model_error::ModelError;

use common::ErrorLocation;

use std::collections::BTreeMap;
use std::panic::Location;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "a boolean",
            ParamValue::Int(_) => "an integer",
            ParamValue::Float(_) => "a number",
            ParamValue::Text(_) => "a string",
            ParamValue::List(_) => "a list",
            ParamValue::Map(_) => "an object",
        }
    }

    /// Integers are accepted wherever a number is expected.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(value) => Some(*value),
            ParamValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// A two-element numeric list, `[x, y]`.
    pub fn as_point(&self) -> Option<[f64; 2]> {
        match self {
            ParamValue::List(items) => match items.as_slice() {
                [x, y] => Some([x.as_f64()?, y.as_f64()?]),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(value: Vec<ParamValue>) -> Self {
        ParamValue::List(value)
    }
}

impl From<[f64; 2]> for ParamValue {
    fn from([x, y]: [f64; 2]) -> Self {
        ParamValue::List(vec![ParamValue::Float(x), ParamValue::Float(y)])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    #[track_caller]
    pub fn require_f64(&self, key: &str) -> Result<f64, ModelError> {
        let value = self.optional_f64(key)?;
        value.ok_or_else(|| missing(key))
    }

    #[track_caller]
    pub fn optional_f64(&self, key: &str) -> Result<Option<f64>, ModelError> {
        self.typed(key, "a number", ParamValue::as_f64)
    }

    #[track_caller]
    pub fn require_i64(&self, key: &str) -> Result<i64, ModelError> {
        let value = self.optional_i64(key)?;
        value.ok_or_else(|| missing(key))
    }

    #[track_caller]
    pub fn optional_i64(&self, key: &str) -> Result<Option<i64>, ModelError> {
        self.typed(key, "an integer", ParamValue::as_i64)
    }

    #[track_caller]
    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>, ModelError> {
        self.typed(key, "a boolean", ParamValue::as_bool)
    }

    #[track_caller]
    pub fn require_str(&self, key: &str) -> Result<&str, ModelError> {
        let value = self.optional_str(key)?;
        value.ok_or_else(|| missing(key))
    }

    #[track_caller]
    pub fn optional_str(&self, key: &str) -> Result<Option<&str>, ModelError> {
        self.typed(key, "a string", ParamValue::as_str)
    }

    /// A list of `[x, y]` pairs.
    #[track_caller]
    pub fn require_points(&self, key: &str) -> Result<Vec<[f64; 2]>, ModelError> {
        let points = self.typed(key, "a list of [x, y] points", |value| match value {
            ParamValue::List(items) => items.iter().map(ParamValue::as_point).collect(),
            _ => None,
        })?;
        points.ok_or_else(|| missing(key))
    }

    /// A list of strings; a single string is accepted as a one-element list.
    #[track_caller]
    pub fn optional_str_list(&self, key: &str) -> Result<Option<Vec<String>>, ModelError> {
        self.typed(key, "a list of strings", |value| match value {
            ParamValue::Text(text) => Some(vec![text.clone()]),
            ParamValue::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => None,
        })
    }

    #[track_caller]
    fn typed<'a, T>(
        &'a self,
        key: &str,
        expected: &'static str,
        extract: impl Fn(&'a ParamValue) -> Option<T>,
    ) -> Result<Option<T>, ModelError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => match extract(value) {
                Some(extracted) => Ok(Some(extracted)),
                None => Err(ModelError::InvalidParam {
                    key: key.to_string(),
                    expected,
                    found: value.type_name(),
                    location: ErrorLocation::from(Location::caller()),
                }),
            },
        }
    }
}

#[track_caller]
fn missing(key: &str) -> ModelError {
    ModelError::MissingParam {
        key: key.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
