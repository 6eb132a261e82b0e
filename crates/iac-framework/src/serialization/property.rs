//! Host-side value trees.
//!
//! [`PropertyValue`] is a fully resolved, plain tree: what the deserializer produces from a
//! wire value once secrets and unknowns have been lifted out. [`InputValue`] is what user
//! code hands to a registration: the same tree, except that any node may still be an
//! [`Output`].

use crate::asset::{Archive, Asset, AssetOrArchive};
use crate::output::Output;
use crate::resource::Resource;
use crate::serialization::marshal::Marshal;
use std::collections::BTreeMap;

/// Which branch of a two-way union a converted value took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionCase {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
    Asset(Asset),
    Archive(Archive),
    Resource(Resource),
    /// Produced by the converter when the target is a union.
    Union(UnionCase, Box<PropertyValue>),
}

impl PropertyValue {
    /// Name of the value's kind, used in mismatch warnings.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Number(_) => "number",
            PropertyValue::String(_) => "string",
            PropertyValue::Array(_) => "array",
            PropertyValue::Object(_) => "object",
            PropertyValue::Asset(_) => "asset",
            PropertyValue::Archive(_) => "archive",
            PropertyValue::Resource(_) => "resource",
            PropertyValue::Union(..) => "union",
        }
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, PropertyValue)>) -> Self {
        PropertyValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<AssetOrArchive> for PropertyValue {
    fn from(value: AssetOrArchive) -> Self {
        match value {
            AssetOrArchive::Asset(asset) => PropertyValue::Asset(asset),
            AssetOrArchive::Archive(archive) => PropertyValue::Archive(archive),
        }
    }
}

/// A value handed to a registration or call, possibly containing outputs.
#[derive(Debug, Clone)]
pub enum InputValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<InputValue>),
    Object(InputMap),
    Asset(Asset),
    Archive(Archive),
    Resource(Resource),
    Output(Output<InputValue>),
}

/// Top-level resource arguments, keyed by property name.
pub type InputMap = BTreeMap<String, InputValue>;

impl InputValue {
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, InputValue)>) -> Self {
        InputValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Bool(value)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        InputValue::Number(value.into())
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Number(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::String(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::String(value)
    }
}

impl From<Resource> for InputValue {
    fn from(value: Resource) -> Self {
        InputValue::Resource(value)
    }
}

impl From<Asset> for InputValue {
    fn from(value: Asset) -> Self {
        InputValue::Asset(value)
    }
}

impl From<Archive> for InputValue {
    fn from(value: Archive) -> Self {
        InputValue::Archive(value)
    }
}

impl From<Vec<InputValue>> for InputValue {
    fn from(value: Vec<InputValue>) -> Self {
        InputValue::Array(value)
    }
}

impl<T: Marshal> From<Output<T>> for InputValue {
    fn from(value: Output<T>) -> Self {
        value.to_input()
    }
}

/// Types that can be passed as resource arguments.
pub trait ResourceArgs {
    fn to_inputs(&self) -> InputMap;
}

impl ResourceArgs for InputMap {
    fn to_inputs(&self) -> InputMap {
        self.clone()
    }
}

impl ResourceArgs for () {
    fn to_inputs(&self) -> InputMap {
        InputMap::new()
    }
}
