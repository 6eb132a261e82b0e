//! # Resources
//!
//! A [`Resource`] is a cheap, cloneable handle onto a resource registered with (or looked up
//! from) the engine. Handles are created by the [`Deployment`](crate::Deployment); the
//! graph around them (parents, children, providers, transformations) lives in the
//! deployment's [`ResourceArena`], indexed by [`ResourceId`].

pub mod arena;
pub mod options;
pub mod transformation;
pub mod urn;

pub use arena::ResourceArena;
pub use options::{Alias, AliasParent, AliasSpec, CallOptions, ResourceOptions};
pub use transformation::{ResourceTransformation, TransformationArgs, TransformationResult};

use crate::output::{Output, ResourceId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// What kind of resource a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Managed by a provider plugin.
    Custom,
    /// Plugin configuration for a package.
    Provider,
    /// A local aggregation of other resources.
    Component,
    /// A component implemented by a plugin; its outputs come back from the engine.
    RemoteComponent,
    /// A handle rebuilt from a bare URN, used only for dependency tracking.
    Dependency,
}

impl ResourceKind {
    /// Custom-like resources are the ones the engine manages through a provider.
    pub fn is_custom(self) -> bool {
        matches!(
            self,
            ResourceKind::Custom | ResourceKind::Provider | ResourceKind::Dependency
        )
    }

    pub fn is_component(self) -> bool {
        matches!(self, ResourceKind::Component | ResourceKind::RemoteComponent)
    }
}

struct ResourceInner {
    key: ResourceId,
    resource_type: String,
    name: String,
    kind: ResourceKind,
    urn: Output<String>,
    id: Option<Output<String>>,
    package_version: Option<String>,
}

/// A handle onto a resource.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    pub(crate) fn new(
        key: ResourceId,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        kind: ResourceKind,
        urn: Output<String>,
        id: Option<Output<String>>,
    ) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                key,
                resource_type: resource_type.into(),
                name: name.into(),
                kind,
                urn,
                id,
                package_version: None,
            }),
        }
    }

    /// A dependency handle rebuilt from a resource reference the engine sent back.
    pub(crate) fn from_reference(
        key: ResourceId,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        urn: Output<String>,
        id: Option<Output<String>>,
        package_version: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                key,
                resource_type: resource_type.into(),
                name: name.into(),
                kind: ResourceKind::Dependency,
                urn,
                id,
                package_version,
            }),
        }
    }

    /// The resource's index in the deployment's arena.
    pub fn key(&self) -> ResourceId {
        self.inner.key
    }

    pub fn resource_type(&self) -> &str {
        &self.inner.resource_type
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.inner.kind
    }

    pub fn urn(&self) -> &Output<String> {
        &self.inner.urn
    }

    /// The provider-assigned id. Only custom-like resources have one.
    pub fn id(&self) -> Option<&Output<String>> {
        self.inner.id.as_ref()
    }

    /// The package version carried by the reference this handle was rebuilt from.
    pub fn package_version(&self) -> Option<&str> {
        self.inner.package_version.as_deref()
    }

    /// The package a provider configures, e.g. `aws` for `pulumi:providers:aws`.
    pub fn provider_package(&self) -> Option<&str> {
        match self.kind() {
            ResourceKind::Provider => self
                .resource_type()
                .strip_prefix(urn::PROVIDER_TYPE_PREFIX),
            _ => None,
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("key", &self.key())
            .field("type", &self.resource_type())
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}
