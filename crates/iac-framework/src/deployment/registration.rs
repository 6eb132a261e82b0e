//! Resource construction and the register/read exchange.

use super::{Deployment, OutputSlots};
use crate::error::{Error, Result};
use crate::monitor::{ReadResourceRequest, RegisterResourceRequest};
use crate::output::{CompletionSlot, Output, OutputData, ResourceId};
use crate::resource::arena::NodeConfig;
use crate::resource::urn::{collapse_alias, package_of, ROOT_STACK_TYPE};
use crate::resource::{
    Resource, ResourceKind, ResourceOptions, ResourceTransformation, TransformationArgs,
};
use crate::serialization::{serialize_properties, InputMap, ResourceArgs, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, info_span, warn, Instrument};

impl Deployment {
    /// Registers a custom resource managed by a provider plugin.
    ///
    /// Returns as soon as the resource is constructed; `outputs` (and the handle's URN and
    /// id) resolve once the engine answers.
    pub fn register_custom(
        &self,
        resource_type: &str,
        name: &str,
        args: &impl ResourceArgs,
        options: ResourceOptions,
        outputs: OutputSlots,
    ) -> Result<Resource> {
        self.register(
            ResourceKind::Custom,
            resource_type,
            name,
            args.to_inputs(),
            options,
            outputs,
        )
    }

    /// Registers a provider for `package`, of type `pulumi:providers:{package}`.
    pub fn register_provider(
        &self,
        package: &str,
        name: &str,
        args: &impl ResourceArgs,
        options: ResourceOptions,
        outputs: OutputSlots,
    ) -> Result<Resource> {
        if package.is_empty() {
            return Err(Error::invalid_argument("package", "must not be empty"));
        }
        self.register(
            ResourceKind::Provider,
            &Deployment::provider_type(package),
            name,
            args.to_inputs(),
            options,
            outputs,
        )
    }

    /// Registers a local component. Its outputs are registered later with
    /// [`Deployment::register_outputs`].
    pub fn register_component(
        &self,
        resource_type: &str,
        name: &str,
        options: ResourceOptions,
    ) -> Result<Resource> {
        self.register(
            ResourceKind::Component,
            resource_type,
            name,
            InputMap::new(),
            options,
            OutputSlots::new(),
        )
    }

    /// Registers a component implemented by a plugin. Its outputs come back from the engine.
    pub fn register_remote_component(
        &self,
        resource_type: &str,
        name: &str,
        args: &impl ResourceArgs,
        options: ResourceOptions,
        outputs: OutputSlots,
    ) -> Result<Resource> {
        self.register(
            ResourceKind::RemoteComponent,
            resource_type,
            name,
            args.to_inputs(),
            options,
            outputs,
        )
    }

    fn register(
        &self,
        kind: ResourceKind,
        resource_type: &str,
        name: &str,
        mut args: InputMap,
        mut options: ResourceOptions,
        outputs: OutputSlots,
    ) -> Result<Resource> {
        if resource_type.is_empty() {
            return Err(Error::invalid_argument("type", "must not be empty"));
        }
        if name.is_empty() {
            return Err(Error::invalid_argument("name", "must not be empty"));
        }
        tokio::runtime::Handle::try_current().map_err(|_| {
            Error::invalid_argument(name, "resources must be registered inside a Tokio runtime")
        })?;

        let (urn_slot, urn) = CompletionSlot::new("urn");
        let (id_slot, id) = if kind.is_custom() {
            let (slot, id) = CompletionSlot::new("id");
            (Some(slot), Some(id))
        } else {
            (None, None)
        };

        // Lookups by URN never fall back to the ambient stack.
        let parent = if resource_type == ROOT_STACK_TYPE {
            None
        } else if options.parent.is_some() {
            options.parent.clone()
        } else if options.urn.is_none() {
            self.stack()
        } else {
            None
        };

        let mut transformations: Vec<ResourceTransformation> = parent
            .as_ref()
            .map(|p| self.arena().transformations_of(p.key()))
            .unwrap_or_default();
        transformations.extend(options.transformations.iter().cloned());
        for transformation in &transformations {
            let input = TransformationArgs {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                kind,
                args: args.clone(),
                options: options.clone(),
            };
            if let Some(result) = transformation(&input) {
                if result.options.parent != options.parent {
                    return Err(Error::TransformationChangedParent {
                        resource: name.to_string(),
                    });
                }
                args = result.args;
                options = result.options;
            }
        }

        if kind.is_component() && options.provider.is_some() && !options.providers.is_empty() {
            return Err(Error::ConflictingProviders {
                resource: name.to_string(),
            });
        }
        for provider in options.provider.iter().chain(&options.providers) {
            if provider.kind() != ResourceKind::Provider {
                return Err(Error::invalid_argument(
                    "provider",
                    &format!("{} is not a provider resource", provider.name()),
                ));
            }
        }

        let parent_key = parent.as_ref().map(Resource::key);
        let mut providers = parent_key
            .map(|key| self.arena().providers_of(key))
            .unwrap_or_default();
        let mut explicit_providers = BTreeMap::new();
        let mut provider = None;
        match kind {
            ResourceKind::Custom => {
                let package = package_of(resource_type);
                let from_map = package.and_then(|package| {
                    options
                        .providers
                        .iter()
                        .find(|p| p.provider_package() == Some(package))
                        .cloned()
                });
                if options.provider.is_some() && from_map.is_some() {
                    warn!(
                        resource = name,
                        "Both provider and providers name a provider for this package; using provider"
                    );
                }
                provider = options
                    .provider
                    .clone()
                    .or(from_map)
                    .or_else(|| package.and_then(|package| providers.get(package)).cloned());
                if let (Some(package), Some(chosen)) = (package, &provider) {
                    providers.insert(package.to_string(), chosen.clone());
                }
            }
            ResourceKind::Component | ResourceKind::RemoteComponent => {
                for explicit in options.provider.iter().chain(&options.providers) {
                    if let Some(package) = explicit.provider_package() {
                        providers.insert(package.to_string(), explicit.clone());
                        explicit_providers.insert(package.to_string(), explicit.clone());
                    }
                }
            }
            ResourceKind::Provider | ResourceKind::Dependency => {}
        }

        let (inherited_version, inherited_url) = parent_key
            .map(|key| self.arena().plugin_of(key))
            .unwrap_or_default();
        if options.version.is_none() {
            options.version = inherited_version;
        }
        if options.plugin_download_url.is_none() {
            options.plugin_download_url = inherited_url;
        }
        let protect = options
            .protect
            .or_else(|| parent_key.and_then(|key| self.arena().protect_of(key)));

        let aliases = options
            .aliases
            .iter()
            .map(|alias| collapse_alias(alias, name, resource_type, parent.as_ref(), self.settings()))
            .collect();

        let config = NodeConfig {
            parent: parent_key,
            providers,
            transformations,
            protect,
            version: options.version.clone(),
            plugin_download_url: options.plugin_download_url.clone(),
        };
        let resource = self.arena().insert(config, |key| {
            Resource::new(key, resource_type, name, kind, urn, id)
        });
        debug!(
            resource = %resource.key(),
            resource_type,
            name,
            parent = ?parent_key,
            "Constructed resource"
        );

        let registration = Registration {
            deployment: self.clone(),
            resource: resource.clone(),
            parent,
            args,
            options,
            provider,
            explicit_providers,
            protect,
            aliases,
            urn_slot,
            id_slot,
            outputs,
        };
        let span = info_span!("registration", resource_type, name);
        self.track(tokio::spawn(registration.run().instrument(span)));
        Ok(resource)
    }
}

/// The engine's answer to a register, read or lookup request.
struct Registered {
    urn: String,
    id: String,
    object: BTreeMap<String, Value>,
    property_dependencies: BTreeMap<String, Vec<String>>,
}

/// The asynchronous half of a construction. Owns the resource's completion slots.
struct Registration {
    deployment: Deployment,
    resource: Resource,
    parent: Option<Resource>,
    args: InputMap,
    options: ResourceOptions,
    provider: Option<Resource>,
    explicit_providers: BTreeMap<String, Resource>,
    protect: Option<bool>,
    aliases: Vec<Output<String>>,
    urn_slot: CompletionSlot<String>,
    id_slot: Option<CompletionSlot<String>>,
    outputs: OutputSlots,
}

impl Registration {
    async fn run(self) -> Result<()> {
        let outcome = match self.read_id_is_unknown().await {
            Ok(true) => self.complete_unknown(),
            Ok(false) => match self.exchange().await {
                Ok(registered) => self.complete(registered),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            warn!(error = %e, "Registration failed");
            self.fail_pending(e);
        }
        outcome
    }

    /// A read whose id is not known yet (typically during a preview) is never sent.
    async fn read_id_is_unknown(&self) -> Result<bool> {
        match &self.options.id {
            Some(id) if self.resource.kind().is_custom() && self.options.urn.is_none() => Ok(id
                .value()
                .await?
                .filter(|id| !id.is_empty())
                .is_none()),
            _ => Ok(false),
        }
    }

    fn complete_unknown(&self) -> Result<()> {
        debug!("Read skipped, id not known");
        let resources = BTreeSet::from([self.resource.key()]);
        self.urn_slot
            .resolve(OutputData::new(None, false, resources.clone()))?;
        if let Some(id_slot) = &self.id_slot {
            id_slot.resolve(OutputData::new(None, false, resources.clone()))?;
        }
        let mut first_error = None;
        for slot in self.outputs.iter() {
            let context = format!("{}.{}", self.resource.resource_type(), slot.name());
            if let Err(e) = slot.resolve_value(&self.deployment, &context, None, resources.clone()) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn exchange(&self) -> Result<Registered> {
        let deployment = &self.deployment;
        let resource = &self.resource;
        let kind = resource.kind();
        let (keep_secrets, keep_resources) = deployment.serialization_features().await?;

        let serialized =
            serialize_properties(resource.name(), &self.args, keep_resources, keep_secrets).await?;
        let mut direct = serialized.all_dependencies();
        direct.extend(self.options.depends_on.iter().map(Resource::key));
        let dependencies = deployment
            .dependency_urns(direct, Some(resource.key()))
            .await?;
        let mut property_dependencies = BTreeMap::new();
        for (property, keys) in &serialized.property_dependencies {
            let urns = deployment
                .dependency_urns(keys.iter().copied(), Some(resource.key()))
                .await?;
            if !urns.is_empty() {
                property_dependencies.insert(property.clone(), urns);
            }
        }

        let parent = match &self.parent {
            Some(parent) => parent.urn().value().await?.unwrap_or_default(),
            None => String::new(),
        };
        let provider = match &self.provider {
            Some(provider) => deployment.provider_reference(provider).await?,
            None => String::new(),
        };
        let mut providers = BTreeMap::new();
        for (package, provider) in &self.explicit_providers {
            providers.insert(package.clone(), deployment.provider_reference(provider).await?);
        }
        let mut aliases = Vec::with_capacity(self.aliases.len());
        for alias in &self.aliases {
            aliases.extend(alias.value().await?);
        }

        let read_id = match (&self.options.id, kind.is_custom()) {
            (Some(id), true) => Some(id.value().await?.unwrap_or_default()),
            _ => None,
        };

        if self.options.urn.is_some() || read_id.is_some() {
            let request = ReadResourceRequest {
                id: read_id.unwrap_or_default(),
                urn: self.options.urn.clone().unwrap_or_default(),
                resource_type: resource.resource_type().to_string(),
                name: resource.name().to_string(),
                parent,
                properties: serialized.object,
                dependencies,
                provider,
                version: self.options.version.clone().unwrap_or_default(),
                plugin_download_url: self.options.plugin_download_url.clone().unwrap_or_default(),
                accept_secrets: true,
                accept_resources: true,
                additional_secret_outputs: self.options.additional_secret_outputs.clone(),
                package_ref: self.options.package_ref.clone().unwrap_or_default(),
            };
            info!("Reading resource");
            debug!(?request, "ReadResource request");
            let _permit = deployment.permit().await;
            let response = deployment.monitor().read_resource(request).await?;
            debug!(?response, "ReadResource response");
            info!(urn = %response.urn, "Read resource");
            return Ok(Registered {
                urn: response.urn,
                id: response.id,
                object: response.properties,
                property_dependencies: BTreeMap::new(),
            });
        }

        let request = RegisterResourceRequest {
            resource_type: resource.resource_type().to_string(),
            name: resource.name().to_string(),
            parent,
            custom: kind.is_custom(),
            remote: kind == ResourceKind::RemoteComponent,
            object: serialized.object,
            protect: self.protect,
            dependencies,
            property_dependencies,
            provider,
            providers,
            delete_before_replace: self.options.delete_before_replace,
            ignore_changes: self.options.ignore_changes.clone(),
            version: self.options.version.clone().unwrap_or_default(),
            plugin_download_url: self.options.plugin_download_url.clone().unwrap_or_default(),
            accept_secrets: true,
            accept_resources: true,
            additional_secret_outputs: self.options.additional_secret_outputs.clone(),
            aliases,
            import_id: self.options.import_id.clone().unwrap_or_default(),
            retain_on_delete: self.options.retain_on_delete,
            package_ref: self.options.package_ref.clone().unwrap_or_default(),
        };
        info!("Registering resource");
        debug!(?request, "RegisterResource request");
        let _permit = deployment.permit().await;
        let response = deployment.monitor().register_resource(request).await?;
        debug!(?response, "RegisterResource response");
        info!(urn = %response.urn, "Registered resource");
        Ok(Registered {
            urn: response.urn,
            id: response.id,
            object: response.object,
            property_dependencies: response.property_dependencies,
        })
    }

    fn complete(&self, registered: Registered) -> Result<()> {
        let Registered {
            urn,
            id,
            object,
            property_dependencies,
        } = registered;
        let key = self.resource.key();
        self.deployment.arena().record_urn(key, &urn);
        self.urn_slot
            .resolve(OutputData::known(urn).with_resources([key]))?;
        if let Some(id_slot) = &self.id_slot {
            let id = Some(id).filter(|id| !id.is_empty());
            id_slot.resolve(OutputData::new(id, false, BTreeSet::from([key])))?;
        }

        let mut first_error = None;
        for slot in self.outputs.iter() {
            let mut resources = BTreeSet::from([key]);
            if self.resource.kind() == ResourceKind::RemoteComponent {
                resources.extend(self.engine_dependencies(&property_dependencies, slot.name()));
            }
            let context = format!("{}.{}", self.resource.resource_type(), slot.name());
            let value = object.get(slot.name());
            if let Err(e) = slot.resolve_value(&self.deployment, &context, value, resources) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn engine_dependencies(
        &self,
        property_dependencies: &BTreeMap<String, Vec<String>>,
        property: &str,
    ) -> Vec<ResourceId> {
        property_dependencies
            .get(property)
            .into_iter()
            .flatten()
            .map(|urn| self.deployment.resource_for_urn(urn).key())
            .collect()
    }

    /// Fails every slot that has not been resolved yet.
    fn fail_pending(&self, cause: &Error) {
        let error = Error::RegistrationFailed {
            resource: self.resource.name().to_string(),
            reason: cause.to_string(),
        };
        if !self.urn_slot.is_resolved() {
            let _ = self.urn_slot.fail(error.clone());
        }
        if let Some(id_slot) = self.id_slot.as_ref().filter(|slot| !slot.is_resolved()) {
            let _ = id_slot.fail(error.clone());
        }
        for slot in self.outputs.iter().filter(|slot| !slot.is_resolved()) {
            let _ = slot.fail(error.clone());
        }
    }
}
