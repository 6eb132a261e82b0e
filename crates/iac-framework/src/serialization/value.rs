//! The untyped wire value tree exchanged with the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reference to a resource as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    pub urn: String,
    /// Present for custom resources; `Some("")` when the id is not known yet.
    pub id: Option<String>,
    pub package_version: Option<String>,
}

impl ResourceReference {
    pub fn new(urn: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            id: None,
            package_version: None,
        }
    }
}

/// A wire value.
///
/// Assets and archives have no dedicated variant: on the wire they are objects tagged with a
/// signature key, and the deserializer recognizes them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "serde_json::Value", from = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// A value the engine does not know yet.
    Unknown,
    Secret(Box<Value>),
    ResourceReference(ResourceReference),
}

impl Value {
    pub fn secret(value: Value) -> Self {
        Value::Secret(Box::new(value))
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
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

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}
