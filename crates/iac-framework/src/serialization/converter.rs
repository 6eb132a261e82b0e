//! Converts wire values into typed outputs.
//!
//! A single visitor walks the target [`Shape`] alongside the deserialized tree and
//! normalizes the tree to that shape. The typed value is then built by
//! [`Marshal::from_property`].
//!
//! Mismatches between a value and its shape are not errors: they are reported through
//! the `warn` callback and the value is replaced with the shape's zero (or an invalid
//! marker for assets and archives). Enums have no zero of their own in the tree; the type's
//! [`Marshal::zero`] supplies the default member. Only a structurally invalid shape fails.

use super::deserializer::{deserialize, ResourceResolver};
use super::marshal::{from_converted, Marshal};
use super::property::{PropertyValue, UnionCase};
use super::shape::{EnumBacking, Shape};
use super::value::Value;
use crate::asset::{Archive, Asset};
use crate::error::Result;
use crate::output::{OutputData, ResourceId};
use std::collections::{BTreeMap, BTreeSet};

/// Converts `value` into `T`.
///
/// The result carries `resources` as its dependencies. It is unknown if any part of
/// `value` was unknown, or if no usable `T` could be built from it.
pub fn convert_value<T: Marshal>(
    warn: &dyn Fn(String),
    context: &str,
    value: &Value,
    resolver: &dyn ResourceResolver,
    resources: BTreeSet<ResourceId>,
) -> Result<OutputData<T>> {
    let shape = T::shape();
    shape.validate(context)?;

    let deserialized = deserialize(value, resolver);
    let value = if deserialized.is_known {
        let normalized = Converter { warn }.convert(context, deserialized.value, &shape);
        match from_converted::<T>(normalized) {
            Ok(value) => Some(value),
            Err(reason) => {
                warn(format!("{reason} deserializing {context}"));
                None
            }
        }
    } else {
        None
    };
    Ok(OutputData::new(value, deserialized.is_secret, resources))
}

/// The value a shape takes when the wire has nothing usable for it.
fn zero(shape: &Shape) -> PropertyValue {
    match shape {
        Shape::Bool => PropertyValue::Bool(false),
        Shape::Int | Shape::Number => PropertyValue::Number(0.0),
        Shape::String => PropertyValue::String(String::new()),
        Shape::Asset | Shape::AssetOrArchive => PropertyValue::Asset(Asset::Invalid),
        Shape::Archive => PropertyValue::Archive(Archive::Invalid),
        Shape::Union(first, _) => PropertyValue::Union(UnionCase::First, Box::new(zero(first))),
        Shape::Array(_) => PropertyValue::Array(Vec::new()),
        Shape::Map { .. } => PropertyValue::Object(BTreeMap::new()),
        Shape::Output(inner) => zero(inner),
        Shape::Any
        | Shape::Json
        | Shape::Resource
        | Shape::Enum(_)
        | Shape::Optional(_)
        | Shape::Record(_)
        | Shape::Unsupported(_) => PropertyValue::Null,
    }
}

struct Converter<'a> {
    warn: &'a dyn Fn(String),
}

impl Converter<'_> {
    fn convert(&self, context: &str, value: PropertyValue, shape: &Shape) -> PropertyValue {
        match self.try_convert(context, value, shape) {
            Ok(value) => value,
            Err(message) => {
                (self.warn)(message);
                zero(shape)
            }
        }
    }

    fn try_convert(
        &self,
        context: &str,
        value: PropertyValue,
        shape: &Shape,
    ) -> std::result::Result<PropertyValue, String> {
        let expected = |value: &PropertyValue| {
            format!(
                "Expected {} but got {} deserializing {context}",
                shape.type_name(),
                value.kind()
            )
        };

        if let PropertyValue::Null = value {
            return match shape {
                // Records still get every parameter, each converted from nothing.
                Shape::Record(_) => {
                    self.try_convert(context, PropertyValue::Object(BTreeMap::new()), shape)
                }
                _ => Ok(zero(shape)),
            };
        }

        match shape {
            Shape::Optional(inner) | Shape::Output(inner) => {
                self.try_convert(context, value, inner)
            }
            Shape::Bool => match value {
                PropertyValue::Bool(_) => Ok(value),
                other => Err(expected(&other)),
            },
            Shape::Int => match value {
                PropertyValue::Number(n) => Ok(PropertyValue::Number(n.trunc())),
                other => Err(expected(&other)),
            },
            Shape::Number => match value {
                PropertyValue::Number(_) => Ok(value),
                other => Err(expected(&other)),
            },
            Shape::String => match value {
                PropertyValue::String(_) => Ok(value),
                other => Err(expected(&other)),
            },
            Shape::Any => Ok(value),
            Shape::Json => check_json(context, &value).map(|()| value),
            // Stale or foreign payloads become invalid markers, without a warning.
            Shape::Asset => match value {
                PropertyValue::Asset(_) => Ok(value),
                _ => Ok(PropertyValue::Asset(Asset::Invalid)),
            },
            Shape::Archive => match value {
                PropertyValue::Archive(_) => Ok(value),
                _ => Ok(PropertyValue::Archive(Archive::Invalid)),
            },
            Shape::AssetOrArchive => match value {
                PropertyValue::Asset(_) | PropertyValue::Archive(_) => Ok(value),
                _ => Ok(PropertyValue::Asset(Asset::Invalid)),
            },
            Shape::Resource => match value {
                PropertyValue::Resource(_) => Ok(value),
                other => Err(expected(&other)),
            },
            Shape::Enum(e) => match (e.backing, value) {
                (EnumBacking::String, value @ PropertyValue::String(_))
                | (EnumBacking::Number, value @ PropertyValue::Number(_)) => Ok(value),
                (backing, other) => Err(format!(
                    "Expected {} backed by a {} but got {} deserializing {context}",
                    e.name,
                    match backing {
                        EnumBacking::String => "string",
                        EnumBacking::Number => "number",
                    },
                    other.kind()
                )),
            },
            Shape::Union(first, second) => {
                let first_context = format!("{context}.AsT0");
                if let Ok(converted) = self.try_convert(&first_context, value.clone(), first) {
                    return Ok(PropertyValue::Union(UnionCase::First, Box::new(converted)));
                }
                let second_context = format!("{context}.AsT1");
                if let Ok(converted) = self.try_convert(&second_context, value.clone(), second) {
                    return Ok(PropertyValue::Union(UnionCase::Second, Box::new(converted)));
                }
                Err(format!(
                    "Expected {} or {} but got {} deserializing {context}",
                    first.type_name(),
                    second.type_name(),
                    value.kind()
                ))
            }
            Shape::Array(element) => match value {
                PropertyValue::Array(items) => Ok(PropertyValue::Array(
                    items
                        .into_iter()
                        .map(|item| self.convert(context, item, element))
                        .collect(),
                )),
                other => Err(expected(&other)),
            },
            Shape::Map { value: element, .. } => match value {
                PropertyValue::Object(_) if **element == Shape::Any => Ok(value),
                PropertyValue::Object(entries) => Ok(PropertyValue::Object(
                    entries
                        .into_iter()
                        .map(|(k, v)| {
                            let converted = self.convert(context, v, element);
                            (k, converted)
                        })
                        .collect(),
                )),
                other => Err(expected(&other)),
            },
            Shape::Record(record) => {
                let mut entries = match value {
                    PropertyValue::Object(entries) => entries,
                    other => return Err(expected(&other)),
                };
                let mut fields = BTreeMap::new();
                for parameter in (record.parameters)() {
                    // Missing properties (e.g. unknowns during a preview) convert from nothing.
                    let raw = entries
                        .remove(parameter.wire_name)
                        .unwrap_or(PropertyValue::Null);
                    let field_context = format!("{}({})", record.name, parameter.name);
                    let converted = self.convert(&field_context, raw, &parameter.shape);
                    fields.insert(parameter.name.to_string(), converted);
                }
                Ok(PropertyValue::Object(fields))
            }
            Shape::Unsupported(name) => Err(format!(
                "Unexpected target type {name} when deserializing {context}"
            )),
        }
    }
}

fn check_json(context: &str, value: &PropertyValue) -> std::result::Result<(), String> {
    match value {
        PropertyValue::Null
        | PropertyValue::Bool(_)
        | PropertyValue::Number(_)
        | PropertyValue::String(_) => Ok(()),
        PropertyValue::Array(items) => items.iter().try_for_each(|v| check_json(context, v)),
        PropertyValue::Object(entries) => {
            entries.values().try_for_each(|v| check_json(context, v))
        }
        other => Err(format!(
            "Unexpected {} when converting {context} to JSON",
            other.kind()
        )),
    }
}
