//! Resource transformations.
//!
//! A transformation sees a resource's type, name, arguments and options before the resource
//! is registered, and may return replacements for the arguments and options. Returning
//! `None` leaves them untouched. Changing the parent is rejected by the registration.

use super::options::ResourceOptions;
use super::ResourceKind;
use crate::serialization::property::InputMap;
use std::sync::Arc;

pub struct TransformationArgs {
    pub resource_type: String,
    pub name: String,
    pub kind: ResourceKind,
    pub args: InputMap,
    pub options: ResourceOptions,
}

pub struct TransformationResult {
    pub args: InputMap,
    pub options: ResourceOptions,
}

pub type ResourceTransformation =
    Arc<dyn Fn(&TransformationArgs) -> Option<TransformationResult> + Send + Sync>;
