/// Sharding key values supplied by callers.
///
/// The default selectors only accept a single integer value; the other
/// variants exist for custom selector implementations (text hashing,
/// composite keys) and for raw query parameters crossing the client
/// boundary.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl KeyValue {
    /// Integer view used by the default selectors. Signed values wrap
    /// through the unsigned cast, so the mapping stays total and stable.
    pub fn as_routing_int(&self) -> Option<u64> {
        match self {
            KeyValue::Int(v) => Some(*v as u64),
            KeyValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Short type tag for contract-violation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            KeyValue::Null => "null",
            KeyValue::Bool(_) => "bool",
            KeyValue::Int(_) => "int",
            KeyValue::Uint(_) => "uint",
            KeyValue::Float(_) => "float",
            KeyValue::Text(_) => "text",
            KeyValue::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Null => write!(f, "NULL"),
            KeyValue::Bool(v) => write!(f, "{}", v),
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Uint(v) => write!(f, "{}", v),
            KeyValue::Float(v) => write!(f, "{}", v),
            KeyValue::Text(v) => write!(f, "{}", v),
            KeyValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        KeyValue::Int(v as i64)
    }
}

impl From<u64> for KeyValue {
    fn from(v: u64) -> Self {
        KeyValue::Uint(v)
    }
}

impl From<u32> for KeyValue {
    fn from(v: u32) -> Self {
        KeyValue::Uint(v as u64)
    }
}

impl From<bool> for KeyValue {
    fn from(v: bool) -> Self {
        KeyValue::Bool(v)
    }
}

impl From<f64> for KeyValue {
    fn from(v: f64) -> Self {
        KeyValue::Float(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Text(v.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Text(v)
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(v: Vec<u8>) -> Self {
        KeyValue::Bytes(v)
    }
}
