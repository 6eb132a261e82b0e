//! # Local Engine
//!
//! An in-process deployment engine. It owns the receiving end of a
//! [`MonitorClient`](iac_framework::MonitorClient) channel and answers every
//! [`MonitorRequest`] in a single run loop, so its state needs no locking.
//!
//! ## Structure
//!
//! - [`LocalEngine`] - the run loop and the resource table
//! - [`provider`] - [`ResourceProvider`], the behaviour of resource types and methods
//! - [`error`] - [`EngineError`], reported to the program as an RPC failure
//!
//! ## Usage
//!
//! ```rust
//! use iac_framework::serialization::InputMap;
//! use iac_framework::{Deployment, DeploymentSettings, OutputSlots, ResourceOptions};
//! use iac_sample::engine::LocalEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = DeploymentSettings::new("sample", "dev");
//!     let (engine, client) = LocalEngine::new(settings.clone(), 32);
//!     let handle = tokio::spawn(engine.run());
//!
//!     let deployment = Deployment::new(client, settings);
//!     let widget = deployment
//!         .register_custom("sample:index:Widget", "w1", &InputMap::new(), ResourceOptions::default(), OutputSlots::new())
//!         .unwrap();
//!     deployment.wait_for_registrations().await.unwrap();
//!     assert!(widget.urn().is_known().await.unwrap());
//!
//!     // Dropping the last client stops the engine and hands back its state.
//!     drop(widget);
//!     drop(deployment);
//!     let state = handle.await.unwrap();
//!     assert_eq!(state.resources.len(), 1);
//! }
//! ```
//!
//! ## Behaviour
//!
//! - URNs are built from the request's type, name and parent, like the real engine does
//! - Custom resources get an id `{name}-{n}`, or none during a preview
//! - Registering the same URN twice is an error
//! - Reads by URN return stored state; reads by id adopt the given properties

pub mod error;
pub mod provider;

pub use error::*;
pub use provider::*;

use iac_framework::monitor::{
    features, CallResponse, PropertyMap, ReadResourceRequest, ReadResourceResponse,
    RegisterPackageRequest, RegisterPackageResponse, RegisterResourceOutputsRequest,
    RegisterResourceRequest, RegisterResourceResponse, ResourceCallRequest,
    SupportsFeatureResponse,
};
use iac_framework::resource::urn::create_urn;
use iac_framework::serialization::Value;
use iac_framework::{DeploymentSettings, MonitorClient, MonitorRequest};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const SUPPORTED_FEATURES: [&str; 3] = [
    features::SECRETS,
    features::RESOURCE_REFERENCES,
    features::OUTPUT_VALUES,
];

/// A resource as the engine stores it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResource {
    pub urn: String,
    pub resource_type: String,
    pub name: String,
    /// Empty for components and for custom resources created during a preview.
    pub id: String,
    pub parent: String,
    pub custom: bool,
    pub provider: String,
    pub dependencies: Vec<String>,
    pub outputs: PropertyMap,
    /// True if the resource was read rather than registered.
    pub external: bool,
}

/// Everything the engine recorded. Returned by [`LocalEngine::run`] when the channel closes.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    /// Resources by URN.
    pub resources: BTreeMap<String, StoredResource>,
    /// Outputs registered on components, by URN.
    pub component_outputs: BTreeMap<String, PropertyMap>,
    /// Package references by package name.
    pub packages: BTreeMap<String, String>,
}

impl EngineState {
    pub fn find(&self, resource_type: &str, name: &str) -> Option<&StoredResource> {
        self.resources
            .values()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    fn find_by_id(&self, resource_type: &str, id: &str) -> Option<&StoredResource> {
        self.resources
            .values()
            .find(|r| r.resource_type == resource_type && r.id == id)
    }
}

pub struct LocalEngine {
    receiver: mpsc::Receiver<MonitorRequest>,
    settings: DeploymentSettings,
    provider: Box<dyn ResourceProvider>,
    state: EngineState,
    next_id: u32,
}

impl LocalEngine {
    /// Creates an engine serving the [`SampleResources`] package, and the client that talks
    /// to it.
    pub fn new(settings: DeploymentSettings, buffer_size: usize) -> (Self, MonitorClient) {
        let (client, receiver) = MonitorClient::channel(buffer_size);
        let engine = Self {
            receiver,
            settings,
            provider: Box::new(SampleResources),
            state: EngineState::default(),
            next_id: 1,
        };
        (engine, client)
    }

    pub fn with_provider(mut self, provider: impl ResourceProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    /// Answers requests until every client is dropped, then returns the recorded state.
    pub async fn run(mut self) -> EngineState {
        info!(
            project = %self.settings.project,
            stack = %self.settings.stack,
            preview = self.settings.dry_run,
            "Engine started"
        );

        while let Some(msg) = self.receiver.recv().await {
            let operation = msg.operation();
            match msg {
                MonitorRequest::SupportsFeature {
                    request,
                    respond_to,
                } => {
                    let has_support = SUPPORTED_FEATURES.contains(&request.id.as_str());
                    debug!(feature = %request.id, has_support, "SupportsFeature");
                    let _ = respond_to.send(Ok(SupportsFeatureResponse { has_support }));
                }
                MonitorRequest::RegisterResource {
                    request,
                    respond_to,
                } => {
                    debug!(?request, "RegisterResource");
                    let result = self.register(request).await;
                    let _ = respond_to.send(result.map_err(|e| e.into_rpc(operation)));
                }
                MonitorRequest::ReadResource {
                    request,
                    respond_to,
                } => {
                    debug!(?request, "ReadResource");
                    let result = self.read(request);
                    let _ = respond_to.send(result.map_err(|e| e.into_rpc(operation)));
                }
                MonitorRequest::Call {
                    request,
                    respond_to,
                } => {
                    debug!(?request, "Call");
                    let result = self.call(request).await;
                    let _ = respond_to.send(result.map_err(|e| e.into_rpc(operation)));
                }
                MonitorRequest::RegisterResourceOutputs {
                    request,
                    respond_to,
                } => {
                    let result = self.register_outputs(request);
                    let _ = respond_to.send(result.map_err(|e| e.into_rpc(operation)));
                }
                MonitorRequest::RegisterPackage {
                    request,
                    respond_to,
                } => {
                    let response = self.register_package(request);
                    let _ = respond_to.send(Ok(response));
                }
            }
        }

        info!(resources = self.state.resources.len(), "Engine stopped");
        self.state
    }

    fn urn(&self, resource_type: &str, name: &str, parent: &str) -> String {
        let parent = Some(parent).filter(|p| !p.is_empty());
        create_urn(
            name,
            resource_type,
            parent,
            &self.settings.project,
            &self.settings.stack,
        )
    }

    fn allocate_id(&mut self, name: &str) -> String {
        let id = format!("{name}-{}", self.next_id);
        self.next_id += 1;
        id
    }

    async fn register(
        &mut self,
        request: RegisterResourceRequest,
    ) -> Result<RegisterResourceResponse, EngineError> {
        let urn = self.urn(&request.resource_type, &request.name, &request.parent);
        if self.state.resources.contains_key(&urn) {
            warn!(%urn, "Duplicate registration");
            return Err(EngineError::DuplicateUrn(urn));
        }

        let preview = self.settings.dry_run;
        let (id, outputs) = if request.custom || request.remote {
            let outputs = self
                .provider
                .create(&request.resource_type, &request.name, &request.object, preview)
                .await?;
            let id = if request.custom && !preview {
                self.allocate_id(&request.name)
            } else {
                String::new()
            };
            (id, outputs)
        } else {
            (String::new(), PropertyMap::new())
        };

        info!(%urn, %id, "Registered");
        self.state.resources.insert(
            urn.clone(),
            StoredResource {
                urn: urn.clone(),
                resource_type: request.resource_type,
                name: request.name,
                id: id.clone(),
                parent: request.parent,
                custom: request.custom,
                provider: request.provider,
                dependencies: request.dependencies,
                outputs: outputs.clone(),
                external: false,
            },
        );
        Ok(RegisterResourceResponse {
            urn,
            id,
            object: outputs,
            stable: false,
            property_dependencies: if request.remote {
                request.property_dependencies
            } else {
                BTreeMap::new()
            },
        })
    }

    fn read(&mut self, request: ReadResourceRequest) -> Result<ReadResourceResponse, EngineError> {
        if !request.urn.is_empty() {
            let stored = self
                .state
                .resources
                .get(&request.urn)
                .ok_or_else(|| EngineError::NotFound(request.urn.clone()))?;
            info!(urn = %stored.urn, "Looked up");
            return Ok(ReadResourceResponse {
                urn: stored.urn.clone(),
                id: stored.id.clone(),
                properties: stored.outputs.clone(),
            });
        }
        if request.id.is_empty() {
            return Err(EngineError::InvalidRequest(format!(
                "read of {} needs an id or a URN",
                request.name
            )));
        }
        if let Some(stored) = self.state.find_by_id(&request.resource_type, &request.id) {
            return Ok(ReadResourceResponse {
                urn: stored.urn.clone(),
                id: stored.id.clone(),
                properties: stored.outputs.clone(),
            });
        }

        let urn = self.urn(&request.resource_type, &request.name, &request.parent);
        info!(%urn, id = %request.id, "Read");
        self.state.resources.insert(
            urn.clone(),
            StoredResource {
                urn: urn.clone(),
                resource_type: request.resource_type,
                name: request.name,
                id: request.id.clone(),
                parent: request.parent,
                custom: true,
                provider: request.provider,
                dependencies: request.dependencies,
                outputs: request.properties.clone(),
                external: true,
            },
        );
        Ok(ReadResourceResponse {
            urn,
            id: request.id,
            properties: request.properties,
        })
    }

    async fn call(&mut self, request: ResourceCallRequest) -> Result<CallResponse, EngineError> {
        let target = match request.args.get("__self__") {
            Some(Value::ResourceReference(reference)) => {
                Some(self.lookup(&reference.urn)?)
            }
            Some(Value::String(urn)) => Some(self.lookup(urn)?),
            _ => None,
        };
        let response = self
            .provider
            .call(&request.tok, &request.args, target.as_ref())
            .await?;
        info!(token = %request.tok, failures = response.failures.len(), "Called");
        Ok(response)
    }

    fn lookup(&self, urn: &str) -> Result<StoredResource, EngineError> {
        self.state
            .resources
            .get(urn)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(urn.to_string()))
    }

    fn register_outputs(&mut self, request: RegisterResourceOutputsRequest) -> Result<(), EngineError> {
        if !self.state.resources.contains_key(&request.urn) {
            return Err(EngineError::NotFound(request.urn));
        }
        info!(urn = %request.urn, count = request.outputs.len(), "Registered outputs");
        self.state
            .component_outputs
            .insert(request.urn, request.outputs);
        Ok(())
    }

    fn register_package(&mut self, request: RegisterPackageRequest) -> RegisterPackageResponse {
        let package_ref = self
            .state
            .packages
            .entry(request.name.clone())
            .or_insert_with(|| format!("{}@{}", request.name, request.version))
            .clone();
        info!(package = %request.name, %package_ref, "Registered package");
        RegisterPackageResponse { package_ref }
    }
}
