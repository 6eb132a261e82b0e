//! # Deployment
//!
//! The [`Deployment`] is the orchestrator that sits between a program and the engine. It owns
//! the resource arena, talks to the engine through a [`Monitor`], and turns engine responses
//! into resolved outputs.
//!
//! ## Registration
//!
//! Registering a resource is split in two:
//!
//! 1. A synchronous part, run by `register_*` before it returns: validation, output slot
//!    allocation, parent resolution, transformations, provider and protect inheritance,
//!    alias collapsing and insertion into the arena. Configuration errors are returned here,
//!    before any request is sent.
//! 2. An asynchronous part, spawned as a task: argument serialization, one register (or
//!    read) exchange with the engine, and resolution of every output slot. If anything in
//!    this part fails, every pending slot of that resource fails with
//!    [`Error::RegistrationFailed`]; other resources are unaffected.
//!
//! ```text
//! Constructed ──▶ PendingRegistration ──▶ Registered
//!                                    └──▶ Failed
//! ```
//!
//! Parent and child registrations run concurrently. Ordering is carried by the URNs in each
//! request; a child only waits for the parent's URN (and provider reference) to fill in its
//! own request.
//!
//! ## Method calls
//!
//! [`Deployment::call`] follows the same serialize, send, convert shape but is independent of
//! the registration state machine and may be repeated.

mod call;
mod registration;
mod slots;

pub use slots::OutputSlots;

use crate::error::{Error, Result};
use crate::monitor::{
    features, Monitor, RegisterPackageRequest, RegisterResourceOutputsRequest,
    SupportsFeatureRequest,
};
use crate::output::{Output, OutputData, ResourceId};
use crate::resource::arena::NodeConfig;
use crate::resource::urn::{parse_urn, ROOT_STACK_TYPE, PROVIDER_TYPE_PREFIX};
use crate::resource::{Resource, ResourceArena, ResourceKind, ResourceOptions};
use crate::serialization::wire::UNKNOWN_VALUE;
use crate::serialization::{serialize_properties, InputMap, ResourceReference, ResourceResolver};
use crate::settings::DeploymentSettings;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct DeploymentInner {
    monitor: Arc<dyn Monitor>,
    settings: DeploymentSettings,
    arena: ResourceArena,
    features: Mutex<HashMap<String, bool>>,
    root: Mutex<Option<Resource>>,
    registrations: Mutex<Vec<JoinHandle<Result<()>>>>,
    warnings: Mutex<Vec<String>>,
    permits: Option<Arc<Semaphore>>,
}

/// Handle onto a running deployment. Cheap to clone.
#[derive(Clone)]
pub struct Deployment {
    inner: Arc<DeploymentInner>,
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("settings", &self.inner.settings)
            .field("resources", &self.inner.arena.len())
            .finish_non_exhaustive()
    }
}

impl Deployment {
    pub fn new(monitor: impl Monitor + 'static, settings: DeploymentSettings) -> Self {
        let permits = (settings.parallel > 0).then(|| Arc::new(Semaphore::new(settings.parallel)));
        Self {
            inner: Arc::new(DeploymentInner {
                monitor: Arc::new(monitor),
                settings,
                arena: ResourceArena::new(),
                features: Mutex::new(HashMap::new()),
                root: Mutex::new(None),
                registrations: Mutex::new(Vec::new()),
                warnings: Mutex::new(Vec::new()),
                permits,
            }),
        }
    }

    pub fn settings(&self) -> &DeploymentSettings {
        &self.inner.settings
    }

    pub fn is_dry_run(&self) -> bool {
        self.inner.settings.dry_run
    }

    pub fn arena(&self) -> &ResourceArena {
        &self.inner.arena
    }

    pub(crate) fn monitor(&self) -> &dyn Monitor {
        self.inner.monitor.as_ref()
    }

    /// The root stack resource, once [`Deployment::run`] has registered it.
    pub fn stack(&self) -> Option<Resource> {
        self.inner.root.lock().clone()
    }

    /// Reports a recoverable problem, such as a property that did not match its type.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.inner.warnings.lock().push(message);
    }

    /// Every warning reported so far.
    pub fn warnings(&self) -> Vec<String> {
        self.inner.warnings.lock().clone()
    }

    /// Asks the engine whether it supports a feature. Answers are cached.
    pub async fn supports_feature(&self, id: &str) -> Result<bool> {
        if let Some(supported) = self.inner.features.lock().get(id) {
            return Ok(*supported);
        }
        let response = self
            .monitor()
            .supports_feature(SupportsFeatureRequest { id: id.to_string() })
            .await?;
        debug!(feature = id, supported = response.has_support, "Feature negotiated");
        self.inner
            .features
            .lock()
            .insert(id.to_string(), response.has_support);
        Ok(response.has_support)
    }

    /// Whether secrets and resource references may be sent as such.
    pub(crate) async fn serialization_features(&self) -> Result<(bool, bool)> {
        let keep_secrets = self.supports_feature(features::SECRETS).await?;
        let keep_resources = self.supports_feature(features::RESOURCE_REFERENCES).await?;
        Ok((keep_secrets, keep_resources))
    }

    /// Waits for a slot when `parallel` bounds in-flight engine requests.
    pub(crate) async fn permit(&self) -> Option<OwnedSemaphorePermit> {
        match &self.inner.permits {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        }
    }

    /// Registers a package and returns the reference resources and calls may carry.
    #[tracing::instrument(skip(self, request), fields(package = %request.name))]
    pub async fn register_package(&self, request: RegisterPackageRequest) -> Result<String> {
        info!(version = %request.version, "Registering package");
        let _permit = self.permit().await;
        let response = self.monitor().register_package(request).await?;
        info!(package_ref = %response.package_ref, "Registered package");
        Ok(response.package_ref)
    }

    /// Registers the outputs of a component (or the root stack).
    #[tracing::instrument(skip(self, resource, outputs), fields(name = %resource.name()))]
    pub async fn register_outputs(&self, resource: &Resource, outputs: InputMap) -> Result<()> {
        let (keep_secrets, keep_resources) = self.serialization_features().await?;
        let serialized =
            serialize_properties(resource.name(), &outputs, keep_resources, keep_secrets).await?;
        let urn = resource.urn().value().await?.unwrap_or_default();
        let request = RegisterResourceOutputsRequest {
            urn,
            outputs: serialized.object,
        };
        debug!(?request, "RegisterResourceOutputs request");
        let _permit = self.permit().await;
        self.monitor()
            .register_resource_outputs(request)
            .await
            .inspect_err(|e| warn!(error = %e, "Registering outputs failed"))?;
        info!(count = outputs.len(), "Registered outputs");
        Ok(())
    }

    /// Runs a program inside a root stack.
    ///
    /// Registers the root stack (`pulumi:pulumi:Stack`, named `{project}-{stack}`) as the
    /// ambient parent, runs `program`, registers the outputs it returns on the stack and
    /// waits for every registration to settle. Returns the first failure.
    pub async fn run<F, Fut>(&self, program: F) -> Result<()>
    where
        F: FnOnce(Deployment) -> Fut,
        Fut: Future<Output = Result<InputMap>>,
    {
        let name = self.settings().root_stack_name();
        let stack = self.register_component(ROOT_STACK_TYPE, &name, ResourceOptions::default())?;
        *self.inner.root.lock() = Some(stack.clone());
        info!(stack = %name, "Running program");

        let outputs = match program(self.clone()).await {
            Ok(outputs) => self.register_outputs(&stack, outputs).await,
            Err(e) => Err(e),
        };
        let settled = self.wait_for_registrations().await;
        outputs.and(settled)
    }

    /// Waits until every spawned registration has finished, including ones spawned while
    /// waiting. Returns the first failure.
    pub async fn wait_for_registrations(&self) -> Result<()> {
        let mut first_error = None;
        loop {
            let pending: Vec<_> = std::mem::take(&mut *self.inner.registrations.lock());
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(Error::Output(e.to_string())),
                };
                if let Err(e) = outcome {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub(crate) fn track(&self, handle: JoinHandle<Result<()>>) {
        self.inner.registrations.lock().push(handle);
    }

    /// A handle for a resource known only by URN. It is never registered.
    pub fn dependency_resource(&self, urn: &str) -> Resource {
        let (resource_type, name) = parse_urn(urn).unwrap_or_default();
        let resource = self.arena().insert(NodeConfig::default(), |key| {
            let urn = OutputData::known(urn.to_string()).with_resources([key]);
            Resource::new(
                key,
                resource_type,
                name,
                ResourceKind::Dependency,
                Output::from_data(urn),
                None,
            )
        });
        self.arena().record_urn(resource.key(), urn);
        resource
    }

    /// Rehydrates a resource reference from the wire.
    ///
    /// A resource this program registered is returned as is. Anything else becomes a
    /// dependency handle that keeps the reference's id and package version, so it
    /// serializes back to the same reference.
    pub fn reference_resource(&self, reference: &ResourceReference) -> Resource {
        let known = self.arena().find_by_urn(&reference.urn).filter(|found| {
            found.kind() != ResourceKind::Dependency
                || found.id().is_some() == reference.id.is_some()
        });
        if let Some(found) = known {
            return found;
        }

        let (resource_type, name) = parse_urn(&reference.urn).unwrap_or_default();
        let resource = self.arena().insert(NodeConfig::default(), |key| {
            let urn = OutputData::known(reference.urn.clone()).with_resources([key]);
            // An empty id means the engine does not know it yet.
            let id = reference.id.as_ref().map(|id| {
                let id = Some(id.clone()).filter(|id| !id.is_empty());
                Output::from_data(OutputData::new(id, false, BTreeSet::from([key])))
            });
            Resource::from_reference(
                key,
                resource_type,
                name,
                Output::from_data(urn),
                id,
                reference.package_version.clone(),
            )
        });
        self.arena().record_urn(resource.key(), &reference.urn);
        resource
    }

    /// The resource registered under `urn`, or a dependency resource standing in for it.
    pub fn resource_for_urn(&self, urn: &str) -> Resource {
        self.arena()
            .find_by_urn(urn)
            .unwrap_or_else(|| self.dependency_resource(urn))
    }

    /// Expands dependencies through components and returns the sorted URNs.
    pub(crate) async fn dependency_urns(
        &self,
        direct: impl IntoIterator<Item = ResourceId>,
        exclude: Option<ResourceId>,
    ) -> Result<Vec<String>> {
        let mut urns = BTreeSet::new();
        for key in self.arena().transitive_dependencies(direct, exclude) {
            let Some(resource) = self.arena().get(key) else {
                continue;
            };
            if let Some(urn) = resource.urn().value().await? {
                urns.insert(urn);
            }
        }
        Ok(urns.into_iter().collect())
    }

    /// Renders a provider as `{urn}::{id}`, with the unknown marker for an unknown id.
    pub(crate) async fn provider_reference(&self, provider: &Resource) -> Result<String> {
        let urn = provider.urn().value().await?.unwrap_or_default();
        let id = match provider.id() {
            Some(id) => id.value().await?,
            None => None,
        };
        Ok(format!(
            "{urn}::{}",
            id.filter(|id| !id.is_empty())
                .unwrap_or_else(|| UNKNOWN_VALUE.to_string())
        ))
    }

    pub(crate) fn provider_type(package: &str) -> String {
        format!("{PROVIDER_TYPE_PREFIX}{package}")
    }
}

impl ResourceResolver for Deployment {
    fn resolve_reference(&self, reference: &ResourceReference) -> Resource {
        self.reference_resource(reference)
    }
}
