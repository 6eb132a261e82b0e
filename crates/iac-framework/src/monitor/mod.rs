//! # Engine Monitor
//!
//! The [`Monitor`] trait is the request/response interface to the deployment engine.
//! [`MonitorClient`] implements it over a Tokio channel: each call becomes a
//! [`MonitorRequest`] carrying a oneshot `respond_to` sender, and whoever owns the
//! receiving end (a transport task, an in-process engine, or a test) answers it.

pub mod types;

pub use types::*;

use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// The one-shot response channel carried by every request.
pub type Response<T> = oneshot::Sender<Result<T>>;

#[async_trait]
pub trait Monitor: Send + Sync {
    async fn supports_feature(&self, request: SupportsFeatureRequest) -> Result<SupportsFeatureResponse>;

    async fn register_resource(&self, request: RegisterResourceRequest) -> Result<RegisterResourceResponse>;

    async fn read_resource(&self, request: ReadResourceRequest) -> Result<ReadResourceResponse>;

    async fn call(&self, request: ResourceCallRequest) -> Result<CallResponse>;

    async fn register_resource_outputs(&self, request: RegisterResourceOutputsRequest) -> Result<()>;

    async fn register_package(&self, request: RegisterPackageRequest) -> Result<RegisterPackageResponse>;
}

/// A request sent to whoever serves a [`MonitorClient`].
#[derive(Debug)]
pub enum MonitorRequest {
    SupportsFeature {
        request: SupportsFeatureRequest,
        respond_to: Response<SupportsFeatureResponse>,
    },
    RegisterResource {
        request: RegisterResourceRequest,
        respond_to: Response<RegisterResourceResponse>,
    },
    ReadResource {
        request: ReadResourceRequest,
        respond_to: Response<ReadResourceResponse>,
    },
    Call {
        request: ResourceCallRequest,
        respond_to: Response<CallResponse>,
    },
    RegisterResourceOutputs {
        request: RegisterResourceOutputsRequest,
        respond_to: Response<()>,
    },
    RegisterPackage {
        request: RegisterPackageRequest,
        respond_to: Response<RegisterPackageResponse>,
    },
}

impl MonitorRequest {
    /// Name of the operation, for logs.
    pub fn operation(&self) -> &'static str {
        match self {
            MonitorRequest::SupportsFeature { .. } => "SupportsFeature",
            MonitorRequest::RegisterResource { .. } => "RegisterResource",
            MonitorRequest::ReadResource { .. } => "ReadResource",
            MonitorRequest::Call { .. } => "Call",
            MonitorRequest::RegisterResourceOutputs { .. } => "RegisterResourceOutputs",
            MonitorRequest::RegisterPackage { .. } => "RegisterPackage",
        }
    }
}

/// A cloneable, channel-backed [`Monitor`].
#[derive(Clone, Debug)]
pub struct MonitorClient {
    sender: mpsc::Sender<MonitorRequest>,
}

impl MonitorClient {
    pub fn new(sender: mpsc::Sender<MonitorRequest>) -> Self {
        Self { sender }
    }

    /// Creates a client and the receiver its requests arrive on.
    pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<MonitorRequest>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self::new(sender), receiver)
    }

    async fn send<T>(&self, build: impl FnOnce(Response<T>) -> MonitorRequest) -> Result<T> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| Error::MonitorClosed)?;
        response.await.map_err(|_| Error::MonitorDropped)?
    }
}

#[async_trait]
impl Monitor for MonitorClient {
    async fn supports_feature(&self, request: SupportsFeatureRequest) -> Result<SupportsFeatureResponse> {
        self.send(|respond_to| MonitorRequest::SupportsFeature { request, respond_to })
            .await
    }

    async fn register_resource(&self, request: RegisterResourceRequest) -> Result<RegisterResourceResponse> {
        self.send(|respond_to| MonitorRequest::RegisterResource { request, respond_to })
            .await
    }

    async fn read_resource(&self, request: ReadResourceRequest) -> Result<ReadResourceResponse> {
        self.send(|respond_to| MonitorRequest::ReadResource { request, respond_to })
            .await
    }

    async fn call(&self, request: ResourceCallRequest) -> Result<CallResponse> {
        self.send(|respond_to| MonitorRequest::Call { request, respond_to })
            .await
    }

    async fn register_resource_outputs(&self, request: RegisterResourceOutputsRequest) -> Result<()> {
        self.send(|respond_to| MonitorRequest::RegisterResourceOutputs { request, respond_to })
            .await
    }

    async fn register_package(&self, request: RegisterPackageRequest) -> Result<RegisterPackageResponse> {
        self.send(|respond_to| MonitorRequest::RegisterPackage { request, respond_to })
            .await
    }
}
