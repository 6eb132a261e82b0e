//! Closed descriptions of marshalable target types.
//!
//! Every [`Marshal`](super::marshal::Marshal) type describes itself as a [`Shape`]. The
//! converter walks shapes instead of inspecting types at runtime, and
//! [`Shape::validate`] rejects structurally invalid shapes once, before any value is
//! converted.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;

/// The primitive an enum converts through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBacking {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumShape {
    pub name: &'static str,
    pub backing: EnumBacking,
}

/// A constructor parameter of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Host-side name; also the key [`RecordFields::take`](super::marshal::RecordFields::take) uses.
    pub name: &'static str,
    /// Property name on the wire.
    pub wire_name: &'static str,
    pub shape: Shape,
}

impl Parameter {
    pub fn new<T: super::marshal::Marshal>(name: &'static str) -> Self {
        Self::renamed::<T>(name, name)
    }

    /// A parameter whose wire property name differs from its host name.
    pub fn renamed<T: super::marshal::Marshal>(name: &'static str, wire_name: &'static str) -> Self {
        Self {
            name,
            wire_name,
            shape: T::shape(),
        }
    }
}

/// A plain data record with a single marshaling constructor.
///
/// Parameters are produced lazily so records may refer to themselves.
#[derive(Clone)]
pub struct RecordShape {
    pub name: &'static str,
    pub parameters: fn() -> Vec<Parameter>,
}

impl PartialEq for RecordShape {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordShape").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Bool,
    /// A number truncated to an integer.
    Int,
    Number,
    String,
    /// The untyped plain tree; converts as identity.
    Any,
    /// A JSON document. Resources and assets are not representable.
    Json,
    Asset,
    Archive,
    AssetOrArchive,
    Resource,
    Optional(Box<Shape>),
    Enum(EnumShape),
    Union(Box<Shape>, Box<Shape>),
    Array(Box<Shape>),
    Map { key: Box<Shape>, value: Box<Shape> },
    Output(Box<Shape>),
    Record(RecordShape),
    /// A host type that cannot be marshaled at all.
    Unsupported(&'static str),
}

impl Shape {
    pub fn optional(inner: Shape) -> Self {
        Shape::Optional(Box::new(inner))
    }

    pub fn array(element: Shape) -> Self {
        Shape::Array(Box::new(element))
    }

    pub fn map(value: Shape) -> Self {
        Shape::Map {
            key: Box::new(Shape::String),
            value: Box::new(value),
        }
    }

    pub fn union(first: Shape, second: Shape) -> Self {
        Shape::Union(Box::new(first), Box::new(second))
    }

    pub fn output(inner: Shape) -> Self {
        Shape::Output(Box::new(inner))
    }

    pub fn record(name: &'static str, parameters: fn() -> Vec<Parameter>) -> Self {
        Shape::Record(RecordShape { name, parameters })
    }

    pub fn type_name(&self) -> String {
        match self {
            Shape::Bool => "bool".into(),
            Shape::Int => "int".into(),
            Shape::Number => "number".into(),
            Shape::String => "string".into(),
            Shape::Any => "any".into(),
            Shape::Json => "json".into(),
            Shape::Asset => "asset".into(),
            Shape::Archive => "archive".into(),
            Shape::AssetOrArchive => "asset or archive".into(),
            Shape::Resource => "resource".into(),
            Shape::Optional(inner) => format!("Option<{}>", inner.type_name()),
            Shape::Enum(e) => e.name.into(),
            Shape::Union(a, b) => format!("Union<{}, {}>", a.type_name(), b.type_name()),
            Shape::Array(e) => format!("Vec<{}>", e.type_name()),
            Shape::Map { key, value } => {
                format!("Map<{}, {}>", key.type_name(), value.type_name())
            }
            Shape::Output(inner) => format!("Output<{}>", inner.type_name()),
            Shape::Record(r) => r.name.into(),
            Shape::Unsupported(name) => (*name).into(),
        }
    }

    /// Checks that this shape can be converted at all.
    ///
    /// Records are visited once each, so self-referential records terminate.
    pub fn validate(&self, context: &str) -> Result<()> {
        self.check(context, &mut HashSet::new())
    }

    fn check(&self, context: &str, seen: &mut HashSet<&'static str>) -> Result<()> {
        let invalid = |reason: String| Error::InvalidShape {
            context: context.to_string(),
            type_name: self.type_name(),
            reason,
        };
        match self {
            Shape::Bool
            | Shape::Int
            | Shape::Number
            | Shape::String
            | Shape::Any
            | Shape::Json
            | Shape::Asset
            | Shape::Archive
            | Shape::AssetOrArchive
            | Shape::Resource
            | Shape::Enum(_) => Ok(()),
            Shape::Optional(inner) => match inner.as_ref() {
                Shape::Optional(_) => Err(invalid("nested optionals are ambiguous".into())),
                inner => inner.check(context, seen),
            },
            Shape::Union(a, b) => {
                a.check(context, seen)?;
                b.check(context, seen)
            }
            Shape::Array(element) => element.check(context, seen),
            Shape::Map { key, value } => {
                if **key != Shape::String {
                    return Err(invalid(format!(
                        "map keys must be strings, not {}",
                        key.type_name()
                    )));
                }
                value.check(context, seen)
            }
            Shape::Output(inner) => match inner.as_ref() {
                Shape::Output(_) => Err(invalid("outputs cannot be nested directly".into())),
                inner => inner.check(context, seen),
            },
            Shape::Record(record) => {
                if !seen.insert(record.name) {
                    return Ok(());
                }
                let parameters = (record.parameters)();
                let mut wire_names = HashSet::new();
                for parameter in &parameters {
                    if !wire_names.insert(parameter.wire_name) {
                        return Err(invalid(format!(
                            "constructor parameter '{}' is declared twice",
                            parameter.wire_name
                        )));
                    }
                    let context = format!("{}({})", record.name, parameter.name);
                    parameter.shape.check(&context, seen)?;
                }
                Ok(())
            }
            Shape::Unsupported(name) => Err(invalid(format!("{name} is not a marshalable type"))),
        }
    }
}
