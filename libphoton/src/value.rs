//! Parameter values carried by operations, responses and events.
//!
//! The server addresses parameters positionally (small integer keys), and each parameter holds one of the
//! types below. Dictionaries are keyed by strings, which covers everything the administration operations
//! exchange (entity references, property names, operation arguments).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Positional operation parameters, keyed by parameter index.
pub type Params = BTreeMap<u8, Value>;

/// A string-keyed dictionary of values.
pub type Dictionary = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    StringArray(Vec<String>),
    Array(Vec<Value>),
    ByteArray(#[serde(with = "byte_array")] Vec<u8>),
    Dictionary(Dictionary),
}

impl Value {
    /// An empty string-keyed dictionary.
    pub fn empty_dictionary() -> Self {
        Value::Dictionary(Dictionary::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as an integer.
    ///
    /// Servers frequently report counters as decimal strings, so strings that parse as integers are accepted
    /// alongside the numeric variants. Doubles are only accepted when they carry no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            Value::Double(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Collect the value as a list of strings. Both string arrays and generic arrays made only of strings
    /// qualify.
    pub fn to_string_list(&self) -> Option<Vec<String>> {
        match self {
            Value::StringArray(items) => Some(items.clone()),
            Value::Array(items) => items.iter().map(|v| v.as_str().map(str::to_string)).collect(),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::StringArray(items) => write!(f, "[{}]", items.join(", ")),
            Value::Array(items) => {
                let items = items.iter().map(|v| v.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Dictionary(d) => {
                let entries = d.iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::ByteArray(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Long(value as i64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Value::Dictionary(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::StringArray(value)
    }
}

/// Byte arrays are tagged so that an untagged deserializer does not confuse them with integer arrays.
mod byte_array {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Bytes {
        bytes: Vec<u8>,
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        Bytes { bytes: bytes.to_vec() }.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Bytes::deserialize(d).map(|b| b.bytes)
    }
}
