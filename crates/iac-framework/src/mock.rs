//! # Mock Engine & Testing Guide
//!
//! [`MockMonitor`] serves a [`MonitorClient`] entirely in memory. Tests declare which
//! engine requests they expect and what each should return, hand the client to a
//! [`Deployment`](crate::Deployment), and check afterwards that every expectation was met.
//!
//! ## Expectations vs. an in-process engine
//!
//! | Feature | MockMonitor | In-process engine |
//! |---------|-------------|-------------------|
//! | **Answers** | Exactly what the test declared | Computed (URNs, ids, echoed inputs) |
//! | **Ordering** | Matched by type and name, token, URN or package | Whatever arrives |
//! | **Error Injection** | Easy (`return_err`) | Hard |
//! | **Use Case** | Registration and conversion logic | Whole programs |
//!
//! ## Pattern 0: Expectations
//!
//! ```rust
//! use iac_framework::mock::MockMonitor;
//! use iac_framework::serialization::{InputMap, InputValue, Value};
//! use iac_framework::{Deployment, DeploymentSettings, Output, OutputSlots, ResourceOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockMonitor::new();
//!     mock.expect_register("pkg:index:Widget", "w1")
//!         .return_outputs("w-1", [("size".to_string(), Value::from(3))].into());
//!
//!     let deployment = Deployment::new(mock.client(), DeploymentSettings::default());
//!     let mut outputs = OutputSlots::new();
//!     let size = outputs.declare::<i32>("size").unwrap();
//!     let args = InputMap::from([("size".to_string(), InputValue::from(Output::create(3)))]);
//!     deployment
//!         .register_custom("pkg:index:Widget", "w1", &args, ResourceOptions::default(), outputs)
//!         .unwrap();
//!
//!     assert_eq!(size.value().await.unwrap(), Some(3));
//!     deployment.wait_for_registrations().await.unwrap();
//!     mock.verify();
//! }
//! ```
//!
//! ## Pattern 1: Hand-driven exchanges
//!
//! [`create_mock_monitor`] returns a client and the receiver its requests arrive on. The
//! `expect_*` helpers pull the next request of a kind, answering feature queries on the
//! way, and hand back the request with its responder.

use crate::error::{Error, Result};
use crate::monitor::{
    features, CallResponse, MonitorClient, MonitorRequest, PropertyMap, ReadResourceRequest,
    ReadResourceResponse, RegisterPackageRequest, RegisterPackageResponse,
    RegisterResourceOutputsRequest, RegisterResourceRequest, RegisterResourceResponse,
    ResourceCallRequest, Response, SupportsFeatureResponse,
};
use crate::resource::urn::create_urn;
use crate::settings::DeploymentSettings;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Features a mock engine supports unless told otherwise.
pub const DEFAULT_FEATURES: [&str; 2] = [features::SECRETS, features::RESOURCE_REFERENCES];

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

type Reply<Req, Resp> = Box<dyn FnOnce(&Req) -> Result<Resp> + Send>;

enum Expectation {
    Register {
        resource_type: String,
        name: String,
        reply: Reply<RegisterResourceRequest, RegisterResourceResponse>,
    },
    Read {
        resource_type: String,
        name: String,
        reply: Reply<ReadResourceRequest, ReadResourceResponse>,
    },
    Call {
        token: String,
        reply: Reply<ResourceCallRequest, CallResponse>,
    },
    RegisterOutputs {
        urn: String,
        reply: Reply<RegisterResourceOutputsRequest, ()>,
    },
    RegisterPackage {
        name: String,
        reply: Reply<RegisterPackageRequest, RegisterPackageResponse>,
    },
}

impl Expectation {
    fn describe(&self) -> String {
        match self {
            Expectation::Register { resource_type, name, .. } => {
                format!("RegisterResource {resource_type} {name}")
            }
            Expectation::Read { resource_type, name, .. } => {
                format!("ReadResource {resource_type} {name}")
            }
            Expectation::Call { token, .. } => format!("Call {token}"),
            Expectation::RegisterOutputs { urn, .. } => format!("RegisterResourceOutputs {urn}"),
            Expectation::RegisterPackage { name, .. } => format!("RegisterPackage {name}"),
        }
    }
}

/// A request the mock engine received.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRequest {
    Register(RegisterResourceRequest),
    Read(ReadResourceRequest),
    Call(ResourceCallRequest),
    RegisterOutputs(RegisterResourceOutputsRequest),
    RegisterPackage(RegisterPackageRequest),
}

struct MockState {
    settings: DeploymentSettings,
    features: HashSet<String>,
    expectations: Vec<Expectation>,
    requests: Vec<RecordedRequest>,
    unexpected: Vec<String>,
}

impl MockState {
    fn take(&mut self, matches: impl Fn(&Expectation) -> bool) -> Option<Expectation> {
        let position = self.expectations.iter().position(matches)?;
        Some(self.expectations.remove(position))
    }
}

fn unexpected(state: &Mutex<MockState>, operation: &str, description: String) -> Error {
    state.lock().unexpected.push(description.clone());
    Error::rpc(operation, format!("unexpected request: {description}"))
}

/// An in-memory engine answering requests from declared expectations.
///
/// Expectations are matched by key (type and name, token, URN or package name) rather than
/// arrival order, since registrations run concurrently. Each expectation answers once.
pub struct MockMonitor {
    client: MonitorClient,
    state: Arc<Mutex<MockState>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Default for MockMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMonitor {
    /// Creates a mock engine for a deployment with default settings.
    pub fn new() -> Self {
        Self::with_settings(DeploymentSettings::default())
    }

    /// Creates a mock engine. `settings` are used to build the URNs of
    /// [`RegisterExpectationBuilder::return_outputs`] answers.
    pub fn with_settings(settings: DeploymentSettings) -> Self {
        let (client, mut receiver) = MonitorClient::channel(100);
        let state = Arc::new(Mutex::new(MockState {
            settings,
            features: DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect(),
            expectations: Vec::new(),
            requests: Vec::new(),
            unexpected: Vec::new(),
        }));
        let state_clone = state.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                Self::answer(&state_clone, request);
            }
        });

        Self {
            client,
            state,
            _handle: handle,
        }
    }

    fn answer(state: &Mutex<MockState>, request: MonitorRequest) {
        match request {
            MonitorRequest::SupportsFeature { request, respond_to } => {
                let has_support = state.lock().features.contains(&request.id);
                let _ = respond_to.send(Ok(SupportsFeatureResponse { has_support }));
            }
            MonitorRequest::RegisterResource { request, respond_to } => {
                let expectation = state.lock().take(|e| {
                    matches!(e, Expectation::Register { resource_type, name, .. }
                        if *resource_type == request.resource_type && *name == request.name)
                });
                let result = match expectation {
                    Some(Expectation::Register { reply, .. }) => reply(&request),
                    _ => Err(unexpected(
                        state,
                        "RegisterResource",
                        format!("RegisterResource {} {}", request.resource_type, request.name),
                    )),
                };
                state.lock().requests.push(RecordedRequest::Register(request));
                let _ = respond_to.send(result);
            }
            MonitorRequest::ReadResource { request, respond_to } => {
                let expectation = state.lock().take(|e| {
                    matches!(e, Expectation::Read { resource_type, name, .. }
                        if *resource_type == request.resource_type && *name == request.name)
                });
                let result = match expectation {
                    Some(Expectation::Read { reply, .. }) => reply(&request),
                    _ => Err(unexpected(
                        state,
                        "ReadResource",
                        format!("ReadResource {} {}", request.resource_type, request.name),
                    )),
                };
                state.lock().requests.push(RecordedRequest::Read(request));
                let _ = respond_to.send(result);
            }
            MonitorRequest::Call { request, respond_to } => {
                let expectation = state.lock().take(
                    |e| matches!(e, Expectation::Call { token, .. } if *token == request.tok),
                );
                let result = match expectation {
                    Some(Expectation::Call { reply, .. }) => reply(&request),
                    _ => Err(unexpected(state, "Call", format!("Call {}", request.tok))),
                };
                state.lock().requests.push(RecordedRequest::Call(request));
                let _ = respond_to.send(result);
            }
            MonitorRequest::RegisterResourceOutputs { request, respond_to } => {
                let expectation = state.lock().take(
                    |e| matches!(e, Expectation::RegisterOutputs { urn, .. } if *urn == request.urn),
                );
                let result = match expectation {
                    Some(Expectation::RegisterOutputs { reply, .. }) => reply(&request),
                    _ => Err(unexpected(
                        state,
                        "RegisterResourceOutputs",
                        format!("RegisterResourceOutputs {}", request.urn),
                    )),
                };
                state
                    .lock()
                    .requests
                    .push(RecordedRequest::RegisterOutputs(request));
                let _ = respond_to.send(result);
            }
            MonitorRequest::RegisterPackage { request, respond_to } => {
                let expectation = state.lock().take(
                    |e| matches!(e, Expectation::RegisterPackage { name, .. } if *name == request.name),
                );
                let result = match expectation {
                    Some(Expectation::RegisterPackage { reply, .. }) => reply(&request),
                    _ => Err(unexpected(
                        state,
                        "RegisterPackage",
                        format!("RegisterPackage {}", request.name),
                    )),
                };
                state
                    .lock()
                    .requests
                    .push(RecordedRequest::RegisterPackage(request));
                let _ = respond_to.send(result);
            }
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> MonitorClient {
        self.client.clone()
    }

    /// Replaces the set of supported features.
    pub fn with_features(self, features: &[&str]) -> Self {
        self.state.lock().features = features.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Expects a registration of `name` with type `resource_type`.
    pub fn expect_register(&self, resource_type: &str, name: &str) -> RegisterExpectationBuilder {
        RegisterExpectationBuilder {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            state: self.state.clone(),
        }
    }

    /// Expects a read (or lookup) of `name` with type `resource_type`.
    pub fn expect_read(&self, resource_type: &str, name: &str) -> ReadExpectationBuilder {
        ReadExpectationBuilder {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            state: self.state.clone(),
        }
    }

    /// Expects a call of the method `token`.
    pub fn expect_call(&self, token: &str) -> CallExpectationBuilder {
        CallExpectationBuilder {
            token: token.to_string(),
            state: self.state.clone(),
        }
    }

    /// Expects the outputs of the resource `urn` to be registered.
    pub fn expect_register_outputs(&self, urn: &str) -> RegisterOutputsExpectationBuilder {
        RegisterOutputsExpectationBuilder {
            urn: urn.to_string(),
            state: self.state.clone(),
        }
    }

    /// Expects the package `name` to be registered.
    pub fn expect_register_package(&self, name: &str) -> RegisterPackageExpectationBuilder {
        RegisterPackageExpectationBuilder {
            name: name.to_string(),
            state: self.state.clone(),
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// The registration request received for `name`, if any.
    pub fn registration(&self, name: &str) -> Option<RegisterResourceRequest> {
        self.requests().into_iter().find_map(|request| match request {
            RecordedRequest::Register(request) if request.name == name => Some(request),
            _ => None,
        })
    }

    pub fn calls(&self) -> Vec<ResourceCallRequest> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                RecordedRequest::Call(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Verifies that all expectations were met and nothing unexpected arrived.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.unexpected.is_empty() {
            panic!("Unexpected requests: {:?}", state.unexpected);
        }
        if !state.expectations.is_empty() {
            let remaining: Vec<_> = state.expectations.iter().map(Expectation::describe).collect();
            panic!("Not all expectations were met. Remaining: {remaining:?}");
        }
    }
}

/// Builder for registration expectations.
pub struct RegisterExpectationBuilder {
    resource_type: String,
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl RegisterExpectationBuilder {
    /// Answers with a computed response.
    pub fn respond_with(
        self,
        reply: impl FnOnce(&RegisterResourceRequest) -> Result<RegisterResourceResponse> + Send + 'static,
    ) {
        self.state.lock().expectations.push(Expectation::Register {
            resource_type: self.resource_type,
            name: self.name,
            reply: Box::new(reply),
        });
    }

    /// Answers with exactly `response`.
    pub fn return_ok(self, response: RegisterResourceResponse) {
        self.respond_with(move |_| Ok(response));
    }

    /// Answers with the URN the engine would assign, the provider id `id` (empty for
    /// unknown) and `object` as output properties.
    pub fn return_outputs(self, id: &str, object: PropertyMap) {
        let settings = self.state.lock().settings.clone();
        let id = id.to_string();
        self.respond_with(move |request| {
            let parent = Some(request.parent.as_str()).filter(|p| !p.is_empty());
            Ok(RegisterResourceResponse {
                urn: create_urn(
                    &request.name,
                    &request.resource_type,
                    parent,
                    &settings.project,
                    &settings.stack,
                ),
                id,
                object,
                ..RegisterResourceResponse::default()
            })
        });
    }

    /// Answers with an error.
    pub fn return_err(self, error: Error) {
        self.respond_with(move |_| Err(error));
    }
}

/// Builder for read expectations.
pub struct ReadExpectationBuilder {
    resource_type: String,
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl ReadExpectationBuilder {
    fn push(self, reply: Reply<ReadResourceRequest, ReadResourceResponse>) {
        self.state.lock().expectations.push(Expectation::Read {
            resource_type: self.resource_type,
            name: self.name,
            reply,
        });
    }

    pub fn return_ok(self, response: ReadResourceResponse) {
        self.push(Box::new(move |_| Ok(response)));
    }

    pub fn return_err(self, error: Error) {
        self.push(Box::new(move |_| Err(error)));
    }
}

/// Builder for call expectations.
pub struct CallExpectationBuilder {
    token: String,
    state: Arc<Mutex<MockState>>,
}

impl CallExpectationBuilder {
    fn push(self, reply: Reply<ResourceCallRequest, CallResponse>) {
        self.state.lock().expectations.push(Expectation::Call {
            token: self.token,
            reply,
        });
    }

    pub fn return_ok(self, response: CallResponse) {
        self.push(Box::new(move |_| Ok(response)));
    }

    pub fn return_err(self, error: Error) {
        self.push(Box::new(move |_| Err(error)));
    }
}

/// Builder for output registration expectations.
pub struct RegisterOutputsExpectationBuilder {
    urn: String,
    state: Arc<Mutex<MockState>>,
}

impl RegisterOutputsExpectationBuilder {
    fn push(self, reply: Reply<RegisterResourceOutputsRequest, ()>) {
        self.state.lock().expectations.push(Expectation::RegisterOutputs {
            urn: self.urn,
            reply,
        });
    }

    pub fn return_ok(self) {
        self.push(Box::new(|_| Ok(())));
    }

    pub fn return_err(self, error: Error) {
        self.push(Box::new(move |_| Err(error)));
    }
}

/// Builder for package registration expectations.
pub struct RegisterPackageExpectationBuilder {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl RegisterPackageExpectationBuilder {
    fn push(self, reply: Reply<RegisterPackageRequest, RegisterPackageResponse>) {
        self.state.lock().expectations.push(Expectation::RegisterPackage {
            name: self.name,
            reply,
        });
    }

    pub fn return_ok(self, package_ref: &str) {
        let package_ref = package_ref.to_string();
        self.push(Box::new(move |_| Ok(RegisterPackageResponse { package_ref })));
    }

    pub fn return_err(self, error: Error) {
        self.push(Box::new(move |_| Err(error)));
    }
}

// =============================================================================
// HAND-DRIVEN HELPERS
// =============================================================================

/// Creates a client and the receiver its requests arrive on.
///
/// **Note**: Consider using [`MockMonitor`] for a more fluent API.
pub fn create_mock_monitor(buffer_size: usize) -> (MonitorClient, mpsc::Receiver<MonitorRequest>) {
    MonitorClient::channel(buffer_size)
}

/// Receives the next request that is not a feature query. Feature queries are answered
/// from [`DEFAULT_FEATURES`] on the way.
async fn next_request(receiver: &mut mpsc::Receiver<MonitorRequest>) -> Option<MonitorRequest> {
    loop {
        match receiver.recv().await? {
            MonitorRequest::SupportsFeature { request, respond_to } => {
                let has_support = DEFAULT_FEATURES.contains(&request.id.as_str());
                let _ = respond_to.send(Ok(SupportsFeatureResponse { has_support }));
            }
            other => return Some(other),
        }
    }
}

/// Helper to verify that the next request is a registration.
pub async fn expect_register(
    receiver: &mut mpsc::Receiver<MonitorRequest>,
) -> Option<(RegisterResourceRequest, Response<RegisterResourceResponse>)> {
    match next_request(receiver).await {
        Some(MonitorRequest::RegisterResource { request, respond_to }) => {
            Some((request, respond_to))
        }
        _ => None,
    }
}

/// Helper to verify that the next request is a read.
pub async fn expect_read(
    receiver: &mut mpsc::Receiver<MonitorRequest>,
) -> Option<(ReadResourceRequest, Response<ReadResourceResponse>)> {
    match next_request(receiver).await {
        Some(MonitorRequest::ReadResource { request, respond_to }) => Some((request, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next request is a call.
pub async fn expect_call(
    receiver: &mut mpsc::Receiver<MonitorRequest>,
) -> Option<(ResourceCallRequest, Response<CallResponse>)> {
    match next_request(receiver).await {
        Some(MonitorRequest::Call { request, respond_to }) => Some((request, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{Monitor, SupportsFeatureRequest};
    use crate::serialization::Value;

    fn register_request(resource_type: &str, name: &str) -> RegisterResourceRequest {
        RegisterResourceRequest {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            ..RegisterResourceRequest::default()
        }
    }

    #[tokio::test]
    async fn test_expectations_match_by_key() {
        let mock = MockMonitor::new();
        mock.expect_register("pkg:index:Widget", "a").return_outputs("id-a", PropertyMap::new());
        mock.expect_register("pkg:index:Widget", "b")
            .return_outputs("id-b", [("size".to_string(), Value::from(2))].into());
        let client = mock.client();

        // Answered out of declaration order.
        let b = client
            .register_resource(register_request("pkg:index:Widget", "b"))
            .await
            .unwrap();
        let a = client
            .register_resource(register_request("pkg:index:Widget", "a"))
            .await
            .unwrap();

        assert_eq!(a.urn, "urn:pulumi:dev::project::pkg:index:Widget::a");
        assert_eq!(b.id, "id-b");
        assert_eq!(b.object["size"], Value::from(2));
        assert_eq!(mock.registration("a").map(|r| r.name), Some("a".to_string()));
        mock.verify();
    }

    #[tokio::test]
    async fn test_features_are_configurable() {
        let mock = MockMonitor::new().with_features(&[features::SECRETS]);
        let client = mock.client();

        let secrets = client
            .supports_feature(SupportsFeatureRequest { id: features::SECRETS.into() })
            .await
            .unwrap();
        let references = client
            .supports_feature(SupportsFeatureRequest {
                id: features::RESOURCE_REFERENCES.into(),
            })
            .await
            .unwrap();
        assert!(secrets.has_support);
        assert!(!references.has_support);
    }

    #[tokio::test]
    async fn test_error_injection() {
        let mock = MockMonitor::new();
        mock.expect_call("pkg:index:Widget/describe")
            .return_err(Error::rpc("Call", "boom"));

        let result = mock
            .client()
            .call(ResourceCallRequest {
                tok: "pkg:index:Widget/describe".into(),
                ..ResourceCallRequest::default()
            })
            .await;
        assert_eq!(result, Err(Error::rpc("Call", "boom")));
        mock.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected requests")]
    async fn test_verify_reports_unexpected_requests() {
        let mock = MockMonitor::new();
        let result = mock
            .client()
            .register_resource(register_request("pkg:index:Widget", "stray"))
            .await;
        assert!(matches!(result, Err(Error::Rpc { .. })));
        mock.verify();
    }

    #[tokio::test]
    async fn test_hand_driven_exchange() {
        let (client, mut receiver) = create_mock_monitor(10);

        let task = tokio::spawn(async move {
            client
                .supports_feature(SupportsFeatureRequest { id: features::SECRETS.into() })
                .await?;
            client
                .register_resource(register_request("pkg:index:Widget", "w1"))
                .await
        });

        let (request, responder) = expect_register(&mut receiver)
            .await
            .expect("Expected RegisterResource request");
        assert_eq!(request.name, "w1");
        responder
            .send(Ok(RegisterResourceResponse {
                urn: "urn:pulumi:dev::project::pkg:index:Widget::w1".into(),
                ..RegisterResourceResponse::default()
            }))
            .unwrap();

        let response = task.await.unwrap().unwrap();
        assert_eq!(response.urn, "urn:pulumi:dev::project::pkg:index:Widget::w1");
    }
}
