//! Options that control how a resource is registered.

use super::transformation::ResourceTransformation;
use super::Resource;
use crate::output::Output;
use std::fmt;

/// A previous identity of a resource.
#[derive(Debug, Clone)]
pub enum Alias {
    /// A literal URN.
    Urn(String),
    /// Fields that differ from the resource's current identity.
    Spec(AliasSpec),
}

#[derive(Debug, Clone, Default)]
pub struct AliasSpec {
    pub name: Option<String>,
    pub resource_type: Option<String>,
    pub stack: Option<String>,
    pub project: Option<String>,
    pub parent: AliasParent,
}

/// The parent an alias refers to.
#[derive(Debug, Clone, Default)]
pub enum AliasParent {
    /// Same parent as the resource.
    #[default]
    Inherit,
    NoParent,
    Resource(Resource),
    Urn(String),
}

/// Options for resource registration.
///
/// Everything defaults to "not set", in which case the value is inherited from the parent
/// where inheritance applies (protect, providers, transformations).
#[derive(Clone, Default)]
pub struct ResourceOptions {
    pub parent: Option<Resource>,
    pub depends_on: Vec<Resource>,
    pub protect: Option<bool>,
    pub ignore_changes: Vec<String>,
    pub version: Option<String>,
    pub plugin_download_url: Option<String>,
    /// Provider for a custom resource. On a component, shorthand for a one-entry `providers`.
    /// A custom resource that sets both uses this one; a component rejects the pair.
    pub provider: Option<Resource>,
    /// Providers keyed by their package. A custom resource picks the one for its own
    /// package; components hand all of them down to children.
    pub providers: Vec<Resource>,
    pub aliases: Vec<Alias>,
    pub transformations: Vec<ResourceTransformation>,
    /// Reads an existing custom resource with this provider id instead of creating one.
    pub id: Option<Output<String>>,
    /// Looks up an existing resource by URN instead of registering it.
    pub urn: Option<String>,
    pub import_id: Option<String>,
    pub delete_before_replace: bool,
    pub retain_on_delete: Option<bool>,
    pub additional_secret_outputs: Vec<String>,
    /// Package reference returned by [`Deployment::register_package`](crate::Deployment::register_package).
    pub package_ref: Option<String>,
}

impl fmt::Debug for ResourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("parent", &self.parent)
            .field("depends_on", &self.depends_on)
            .field("protect", &self.protect)
            .field("ignore_changes", &self.ignore_changes)
            .field("version", &self.version)
            .field("provider", &self.provider)
            .field("providers", &self.providers)
            .field("aliases", &self.aliases)
            .field("transformations", &self.transformations.len())
            .field("id", &self.id.is_some())
            .field("urn", &self.urn)
            .field("import_id", &self.import_id)
            .field("package_ref", &self.package_ref)
            .finish_non_exhaustive()
    }
}

/// Options for a method call on a resource.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub parent: Option<Resource>,
    pub provider: Option<Resource>,
    pub version: Option<String>,
    pub plugin_download_url: Option<String>,
    pub package_ref: Option<String>,
}
