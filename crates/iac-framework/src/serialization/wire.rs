//! JSON encoding of the wire tree.
//!
//! Special values are encoded as objects carrying [`SPECIAL_SIG_KEY`], whose string value
//! identifies the kind of payload. Unknowns are encoded as a sentinel string.

use super::value::{ResourceReference, Value};
use serde_json::{Map, Number};
use std::collections::BTreeMap;

pub const SPECIAL_SIG_KEY: &str = "4dabf18193072939515e22adb298388d";
pub const UNKNOWN_VALUE: &str = "04da6b54-80e4-46f7-96ec-b56ff0331ba9";
pub const SECRET_SIG: &str = "1b47061264138c4ac30d75fd1eb44270";
pub const RESOURCE_SIG: &str = "5cf8f73096256a8f31e491e813e4eb8e";
pub const ASSET_SIG: &str = "c44067f5952c0a294b673a41bacd8c17";
pub const ARCHIVE_SIG: &str = "0def7320c3a5731c473e5ecbe6d01bc7";

pub const VALUE_KEY: &str = "value";
pub const URN_KEY: &str = "urn";
pub const ID_KEY: &str = "id";
pub const PACKAGE_VERSION_KEY: &str = "packageVersion";

// Integral floats up to 2^53 round-trip through i64 exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn number(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn signed(sig: &str, fields: impl IntoIterator<Item = (&'static str, serde_json::Value)>) -> serde_json::Value {
    let mut map = Map::new();
    map.insert(SPECIAL_SIG_KEY.to_string(), serde_json::Value::String(sig.to_string()));
    for (key, value) in fields {
        map.insert(key.to_string(), value);
    }
    serde_json::Value::Object(map)
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
            Value::Unknown => serde_json::Value::String(UNKNOWN_VALUE.to_string()),
            Value::Secret(inner) => signed(SECRET_SIG, [(VALUE_KEY, (*inner).into())]),
            Value::ResourceReference(reference) => {
                let mut fields = vec![(URN_KEY, serde_json::Value::String(reference.urn))];
                if let Some(id) = reference.id {
                    fields.push((ID_KEY, serde_json::Value::String(id)));
                }
                if let Some(version) = reference.package_version {
                    fields.push((PACKAGE_VERSION_KEY, serde_json::Value::String(version)));
                }
                signed(RESOURCE_SIG, fields)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) if s == UNKNOWN_VALUE => Value::Unknown,
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => decode_object(map),
        }
    }
}

fn decode_object(mut map: Map<String, serde_json::Value>) -> Value {
    let sig = map
        .get(SPECIAL_SIG_KEY)
        .and_then(|sig| sig.as_str())
        .map(str::to_string);
    match sig.as_deref() {
        Some(SECRET_SIG) if map.contains_key(VALUE_KEY) => {
            let inner = map.remove(VALUE_KEY).unwrap_or_default();
            Value::secret(inner.into())
        }
        Some(RESOURCE_SIG) => match map.get(URN_KEY).and_then(|u| u.as_str()) {
            Some(urn) => {
                let text = |key: &str| map.get(key).and_then(|v| v.as_str()).map(str::to_string);
                Value::ResourceReference(ResourceReference {
                    urn: urn.to_string(),
                    id: text(ID_KEY),
                    package_version: text(PACKAGE_VERSION_KEY).filter(|v| !v.is_empty()),
                })
            }
            None => plain_object(map),
        },
        // Assets, archives and malformed payloads stay plain objects.
        _ => plain_object(map),
    }
}

fn plain_object(map: Map<String, serde_json::Value>) -> Value {
    Value::Object(
        map.into_iter()
            .map(|(k, v)| (k, v.into()))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// Encodes a wire value as JSON text.
pub fn to_json(value: &Value) -> String {
    serde_json::Value::from(value.clone()).to_string()
}

/// Decodes JSON text into a wire value.
pub fn from_json(text: &str) -> serde_json::Result<Value> {
    serde_json::from_str(text)
}
