//! Self-describing values carried by discrete profiles, activity arguments and
//! constraint arguments.
use super::segments::Dynamics;
use crate::time::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedValue {
    Null,
    Boolean(bool),
    Int(i64),
    Real(f64),
    String(String),
    List(Vec<SerializedValue>),
    Map(BTreeMap<String, SerializedValue>),
}

impl Default for SerializedValue {
    fn default() -> Self {
        SerializedValue::Null
    }
}

impl SerializedValue {
    /// Numeric view used when a discrete resource takes part in real arithmetic.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            SerializedValue::Int(i) => Some(*i as f64),
            SerializedValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SerializedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SerializedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Field lookup on a map value.
    pub fn get(&self, key: &str) -> Option<&SerializedValue> {
        match self {
            SerializedValue::Map(fields) => fields.get(key),
            _ => None,
        }
    }
}

impl Dynamics for SerializedValue {
    fn rebase(&self, _elapsed: Duration) -> Self {
        self.clone()
    }
}

impl fmt::Display for SerializedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<bool> for SerializedValue {
    fn from(value: bool) -> Self {
        SerializedValue::Boolean(value)
    }
}

impl From<i64> for SerializedValue {
    fn from(value: i64) -> Self {
        SerializedValue::Int(value)
    }
}

impl From<f64> for SerializedValue {
    fn from(value: f64) -> Self {
        SerializedValue::Real(value)
    }
}

impl From<&str> for SerializedValue {
    fn from(value: &str) -> Self {
        SerializedValue::String(value.to_string())
    }
}
