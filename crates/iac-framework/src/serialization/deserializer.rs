//! Wire tree to plain tree.
//!
//! Lifts unknown markers and secret wrappers out of the tree into flags, turns resource
//! references into handles and decodes assets and archives.

use super::property::PropertyValue;
use super::value::{ResourceReference, Value};
use crate::asset::AssetOrArchive;
use crate::resource::Resource;
use std::collections::BTreeMap;

/// Rehydrates resource references found in wire values.
pub trait ResourceResolver: Send + Sync {
    fn resolve_reference(&self, reference: &ResourceReference) -> Resource;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deserialized {
    pub value: PropertyValue,
    /// False if an unknown marker occurred anywhere in the tree.
    pub is_known: bool,
    /// True if a secret wrapper occurred anywhere in the tree.
    pub is_secret: bool,
}

pub fn deserialize(value: &Value, resolver: &dyn ResourceResolver) -> Deserialized {
    let mut walk = Walk {
        resolver,
        is_known: true,
        is_secret: false,
    };
    let value = walk.visit(value);
    Deserialized {
        value,
        is_known: walk.is_known,
        is_secret: walk.is_secret,
    }
}

struct Walk<'a> {
    resolver: &'a dyn ResourceResolver,
    is_known: bool,
    is_secret: bool,
}

impl Walk<'_> {
    fn visit(&mut self, value: &Value) -> PropertyValue {
        match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Number(n) => PropertyValue::Number(*n),
            Value::String(s) => PropertyValue::String(s.clone()),
            Value::Array(items) => {
                PropertyValue::Array(items.iter().map(|item| self.visit(item)).collect())
            }
            Value::Object(map) => match AssetOrArchive::decode(map) {
                Some(decoded) => decoded.into(),
                None => PropertyValue::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), self.visit(v)))
                        .collect::<BTreeMap<_, _>>(),
                ),
            },
            Value::Unknown => {
                self.is_known = false;
                PropertyValue::Null
            }
            Value::Secret(inner) => {
                self.is_secret = true;
                self.visit(inner)
            }
            Value::ResourceReference(reference) => {
                PropertyValue::Resource(self.resolver.resolve_reference(reference))
            }
        }
    }
}
