//! Service tier of a widget.

use iac_framework::serialization::{EnumBacking, EnumShape, InputValue, Marshal, PropertyValue, Shape};
use std::fmt::Display;

/// A string-backed enum: `"standard"` or `"premium"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    #[default]
    Standard,
    Premium,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Premium => "premium",
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Marshal for Tier {
    fn shape() -> Shape {
        Shape::Enum(EnumShape {
            name: "Tier",
            backing: EnumBacking::String,
        })
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::String(s) if s == "standard" => Ok(Tier::Standard),
            PropertyValue::String(s) if s == "premium" => Ok(Tier::Premium),
            PropertyValue::String(s) => Err(format!("'{s}' is not a Tier")),
            other => Err(format!("expected Tier but got {}", other.kind())),
        }
    }

    fn to_input(&self) -> InputValue {
        InputValue::from(self.as_str())
    }

    fn zero() -> Option<Self> {
        Some(Tier::default())
    }
}
