//! The [`Marshal`] trait: how a host type describes itself to the conversion layer.
//!
//! A type provides its [`Shape`], a constructor from the plain tree the converter hands
//! back, and a rendering into an input tree for serialization.
//!
//! Records implement the trait by hand:
//!
//! ```rust
//! use iac_framework::serialization::{InputValue, Marshal, Parameter, PropertyValue, RecordFields, Shape};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Endpoint {
//!     host: String,
//!     port: i32,
//! }
//!
//! impl Marshal for Endpoint {
//!     fn shape() -> Shape {
//!         Shape::record("Endpoint", || {
//!             vec![Parameter::new::<String>("host"), Parameter::renamed::<i32>("port", "portNumber")]
//!         })
//!     }
//!
//!     fn from_property(value: PropertyValue) -> Result<Self, String> {
//!         let mut fields = RecordFields::new("Endpoint", value)?;
//!         Ok(Self { host: fields.take("host")?, port: fields.take("port")? })
//!     }
//!
//!     fn to_input(&self) -> InputValue {
//!         InputValue::object([("host", self.host.to_input()), ("portNumber", self.port.to_input())])
//!     }
//! }
//! ```

use super::property::{InputValue, PropertyValue, UnionCase};
use super::shape::Shape;
use crate::asset::{Archive, Asset, AssetOrArchive};
use crate::output::{Output, OutputValue};
use crate::resource::Resource;
use std::collections::{BTreeMap, HashMap};

pub trait Marshal: OutputValue {
    fn shape() -> Shape;

    /// Builds the value from a tree the converter has already normalized against
    /// [`Marshal::shape`].
    fn from_property(value: PropertyValue) -> Result<Self, String>;

    fn to_input(&self) -> InputValue;

    /// The value to use when the wire had nothing usable for this type. Enums return their
    /// default member here; everything else builds its zero from the plain tree.
    fn zero() -> Option<Self> {
        None
    }
}

/// Builds `T` from a converted tree, substituting [`Marshal::zero`] for a missing value.
pub(crate) fn from_converted<T: Marshal>(value: PropertyValue) -> Result<T, String> {
    match value {
        PropertyValue::Null => match T::zero() {
            Some(zero) => Ok(zero),
            None => T::from_property(PropertyValue::Null),
        },
        value => T::from_property(value),
    }
}

pub(crate) fn mismatch(expected: &str, value: &PropertyValue) -> String {
    format!("expected {expected} but got {}", value.kind())
}

impl Marshal for bool {
    fn shape() -> Shape {
        Shape::Bool
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::Bool(*self)
    }
}

impl Marshal for i32 {
    fn shape() -> Shape {
        Shape::Int
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Number(n) => Ok(n as i32),
            other => Err(mismatch("int", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::Number((*self).into())
    }
}

impl Marshal for f64 {
    fn shape() -> Shape {
        Shape::Number
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Number(n) => Ok(n),
            other => Err(mismatch("number", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::Number(*self)
    }
}

impl Marshal for String {
    fn shape() -> Shape {
        Shape::String
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::String(self.clone())
    }
}

impl<T: Marshal> Marshal for Option<T> {
    fn shape() -> Shape {
        Shape::optional(T::shape())
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Null => Ok(None),
            other => from_converted::<T>(other).map(Some),
        }
    }

    fn to_input(&self) -> InputValue {
        self.as_ref().map_or(InputValue::Null, Marshal::to_input)
    }
}

impl<T: Marshal> Marshal for Vec<T> {
    fn shape() -> Shape {
        Shape::array(T::shape())
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Array(items) => items.into_iter().map(from_converted::<T>).collect(),
            other => Err(mismatch("array", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::Array(self.iter().map(Marshal::to_input).collect())
    }
}

impl<T: Marshal> Marshal for BTreeMap<String, T> {
    fn shape() -> Shape {
        Shape::map(T::shape())
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Object(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, from_converted::<T>(v)?)))
                .collect(),
            other => Err(mismatch("object", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_input()))
                .collect(),
        )
    }
}

impl<T: Marshal> Marshal for HashMap<String, T> {
    fn shape() -> Shape {
        Shape::map(T::shape())
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        BTreeMap::<String, T>::from_property(value).map(|m| m.into_iter().collect())
    }

    fn to_input(&self) -> InputValue {
        InputValue::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_input()))
                .collect(),
        )
    }
}

/// The untyped tree converts as-is.
impl Marshal for PropertyValue {
    fn shape() -> Shape {
        Shape::Any
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        Ok(value)
    }

    fn to_input(&self) -> InputValue {
        match self {
            PropertyValue::Null => InputValue::Null,
            PropertyValue::Bool(b) => InputValue::Bool(*b),
            PropertyValue::Number(n) => InputValue::Number(*n),
            PropertyValue::String(s) => InputValue::String(s.clone()),
            PropertyValue::Array(items) => {
                InputValue::Array(items.iter().map(Marshal::to_input).collect())
            }
            PropertyValue::Object(entries) => InputValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_input()))
                    .collect(),
            ),
            PropertyValue::Asset(asset) => InputValue::Asset(asset.clone()),
            PropertyValue::Archive(archive) => InputValue::Archive(archive.clone()),
            PropertyValue::Resource(resource) => InputValue::Resource(resource.clone()),
            PropertyValue::Union(_, inner) => inner.to_input(),
        }
    }
}

impl Marshal for serde_json::Value {
    fn shape() -> Shape {
        Shape::Json
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        Ok(match value {
            PropertyValue::Null => serde_json::Value::Null,
            PropertyValue::Bool(b) => serde_json::Value::Bool(b),
            PropertyValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    serde_json::Value::from(n as i64)
                } else {
                    serde_json::Value::from(n)
                }
            }
            PropertyValue::String(s) => serde_json::Value::String(s),
            PropertyValue::Array(items) => serde_json::Value::Array(
                items
                    .into_iter()
                    .map(serde_json::Value::from_property)
                    .collect::<Result<_, _>>()?,
            ),
            PropertyValue::Object(entries) => serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k, serde_json::Value::from_property(v)?)))
                    .collect::<Result<_, String>>()?,
            ),
            other => return Err(mismatch("JSON", &other)),
        })
    }

    fn to_input(&self) -> InputValue {
        match self {
            serde_json::Value::Null => InputValue::Null,
            serde_json::Value::Bool(b) => InputValue::Bool(*b),
            serde_json::Value::Number(n) => InputValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => InputValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                InputValue::Array(items.iter().map(Marshal::to_input).collect())
            }
            serde_json::Value::Object(entries) => InputValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_input()))
                    .collect(),
            ),
        }
    }
}

/// A nested output becomes an already-known output of the converted value.
impl<T: Marshal> Marshal for Output<T> {
    fn shape() -> Shape {
        Shape::output(T::shape())
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        from_converted::<T>(value).map(Output::create)
    }

    fn to_input(&self) -> InputValue {
        InputValue::Output(self.map(|value| value.to_input()))
    }

    fn zero() -> Option<Self> {
        T::zero().map(Output::create)
    }
}

impl Marshal for Resource {
    fn shape() -> Shape {
        Shape::Resource
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Resource(resource) => Ok(resource),
            other => Err(mismatch("resource", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::Resource(self.clone())
    }
}

impl Marshal for Asset {
    fn shape() -> Shape {
        Shape::Asset
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Asset(asset) => Ok(asset),
            other => Err(mismatch("asset", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::Asset(self.clone())
    }
}

impl Marshal for Archive {
    fn shape() -> Shape {
        Shape::Archive
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Archive(archive) => Ok(archive),
            other => Err(mismatch("archive", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::Archive(self.clone())
    }
}

impl Marshal for AssetOrArchive {
    fn shape() -> Shape {
        Shape::AssetOrArchive
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Asset(asset) => Ok(AssetOrArchive::Asset(asset)),
            PropertyValue::Archive(archive) => Ok(AssetOrArchive::Archive(archive)),
            other => Err(mismatch("asset or archive", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        match self {
            AssetOrArchive::Asset(asset) => InputValue::Asset(asset.clone()),
            AssetOrArchive::Archive(archive) => InputValue::Archive(archive.clone()),
        }
    }
}

/// A value that is one of two shapes. Conversion tries `First` before `Second`.
#[derive(Debug, Clone, PartialEq)]
pub enum Union<A, B> {
    First(A),
    Second(B),
}

impl<A: Marshal, B: Marshal> Marshal for Union<A, B> {
    fn shape() -> Shape {
        Shape::union(A::shape(), B::shape())
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Union(UnionCase::First, inner) => {
                from_converted::<A>(*inner).map(Union::First)
            }
            PropertyValue::Union(UnionCase::Second, inner) => {
                from_converted::<B>(*inner).map(Union::Second)
            }
            other => Err(mismatch("union", &other)),
        }
    }

    fn to_input(&self) -> InputValue {
        match self {
            Union::First(a) => a.to_input(),
            Union::Second(b) => b.to_input(),
        }
    }
}

/// Field access for hand-written record [`Marshal::from_property`] impls.
pub struct RecordFields {
    record: &'static str,
    fields: BTreeMap<String, PropertyValue>,
}

impl RecordFields {
    pub fn new(record: &'static str, value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Object(fields) => Ok(Self { record, fields }),
            other => Err(mismatch(record, &other)),
        }
    }

    /// Takes the converted parameter `name` (the host-side name, not the wire name).
    pub fn take<T: Marshal>(&mut self, name: &str) -> Result<T, String> {
        let value = self.fields.remove(name).unwrap_or(PropertyValue::Null);
        from_converted::<T>(value).map_err(|e| format!("{}({name}): {e}", self.record))
    }
}
