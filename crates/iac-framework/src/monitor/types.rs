//! Request and response payloads exchanged with the engine.
//!
//! Property bags are wire trees ([`Value`]); everything else is plain data. All types are
//! serde-serializable with camelCase field names.

use crate::serialization::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level properties of a request or response.
pub type PropertyMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterResourceRequest {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    /// URN of the parent, empty for none.
    pub parent: String,
    pub custom: bool,
    pub remote: bool,
    pub object: PropertyMap,
    pub protect: Option<bool>,
    /// URNs of every resource this one depends on.
    pub dependencies: Vec<String>,
    /// Per-property dependency URNs. Properties without dependencies are omitted.
    pub property_dependencies: BTreeMap<String, Vec<String>>,
    /// Provider reference (`{urn}::{id}`) for custom resources, empty for the default.
    pub provider: String,
    /// Provider references by package, for components.
    pub providers: BTreeMap<String, String>,
    pub delete_before_replace: bool,
    pub ignore_changes: Vec<String>,
    pub version: String,
    pub plugin_download_url: String,
    pub accept_secrets: bool,
    pub accept_resources: bool,
    pub additional_secret_outputs: Vec<String>,
    pub aliases: Vec<String>,
    pub import_id: String,
    pub retain_on_delete: Option<bool>,
    pub package_ref: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterResourceResponse {
    pub urn: String,
    /// Provider-assigned id. Empty while unknown (e.g. during a preview).
    pub id: String,
    pub object: PropertyMap,
    pub stable: bool,
    pub property_dependencies: BTreeMap<String, Vec<String>>,
}

/// Reads an existing resource, either by provider id or, for lookups, by URN.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadResourceRequest {
    pub id: String,
    /// Set for lookups by URN; `id` is empty then.
    pub urn: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub parent: String,
    pub properties: PropertyMap,
    pub dependencies: Vec<String>,
    pub provider: String,
    pub version: String,
    pub plugin_download_url: String,
    pub accept_secrets: bool,
    pub accept_resources: bool,
    pub additional_secret_outputs: Vec<String>,
    pub package_ref: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadResourceResponse {
    pub urn: String,
    pub id: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceCallRequest {
    pub tok: String,
    pub args: PropertyMap,
    pub arg_dependencies: BTreeMap<String, Vec<String>>,
    pub provider: String,
    pub version: String,
    pub plugin_download_url: String,
    pub package_ref: String,
    pub accept_resources: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckFailure {
    pub property: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallResponse {
    #[serde(rename = "return")]
    pub return_values: PropertyMap,
    pub return_dependencies: BTreeMap<String, Vec<String>>,
    pub failures: Vec<CheckFailure>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterResourceOutputsRequest {
    pub urn: String,
    pub outputs: PropertyMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupportsFeatureRequest {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupportsFeatureResponse {
    pub has_support: bool,
}

/// Replaces a package's schema with a parameterized one (e.g. a bridged provider).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Parameterization {
    pub name: String,
    pub version: String,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterPackageRequest {
    pub name: String,
    pub version: String,
    pub download_url: String,
    pub parameterization: Option<Parameterization>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterPackageResponse {
    #[serde(rename = "ref")]
    pub package_ref: String,
}

/// Feature ids negotiated with [`SupportsFeatureRequest`].
pub mod features {
    pub const SECRETS: &str = "secrets";
    pub const RESOURCE_REFERENCES: &str = "resourceReferences";
    pub const OUTPUT_VALUES: &str = "outputValues";
    pub const DELETED_WITH: &str = "deletedWith";
    pub const PARAMETERIZATION: &str = "parameterization";
}
