//! # Conversion layer
//!
//! Maps between the engine's untyped wire tree ([`Value`]) and host types.
//!
//! - Outbound, user inputs ([`InputValue`]) are serialized by [`Serializer`], awaiting the
//!   outputs they contain.
//! - Inbound, wire values are deserialized into a plain tree ([`PropertyValue`]) and then
//!   converted to the target type's [`Shape`] by [`convert_value`].

pub mod converter;
pub mod deserializer;
pub mod marshal;
pub mod property;
pub mod serializer;
pub mod shape;
pub mod value;
pub mod wire;

pub use converter::convert_value;
pub use deserializer::{deserialize, Deserialized, ResourceResolver};
pub use marshal::{Marshal, RecordFields, Union};
pub use property::{InputMap, InputValue, PropertyValue, ResourceArgs, UnionCase};
pub use serializer::{serialize_properties, SerializedProperties, Serializer};
pub use shape::{EnumBacking, EnumShape, Parameter, RecordShape, Shape};
pub use value::{ResourceReference, Value};
