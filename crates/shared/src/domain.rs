use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record as exchanged with the API: field name to JSON value.
pub type Record = Map<String, Value>;

/// Identifier of a record, taken from its configured id field.
///
/// Identity is exact: the integer `1` and the string `"1"` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Number(number) => number.as_i64().map(Self::Int),
            _ => None,
        }
    }

    /// Reads the identifier stored under `id_field`, if it is usable as one.
    pub fn of(record: &Record, id_field: &str) -> Option<Self> {
        record.get(id_field).and_then(Self::from_value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Renders a field value the way it is matched by free-text search.
///
/// `null` has no text form and never matches.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}
