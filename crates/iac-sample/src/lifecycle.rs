//! # System Lifecycle
//!
//! [`SampleSystem`] wires a [`LocalEngine`] to a [`Deployment`] and shuts both down in
//! order.
//!
//! ```rust,ignore
//! let system = SampleSystem::new(DeploymentSettings::new("sample", "dev"));
//! system.deployment.run(program).await?;
//! let state = system.shutdown().await?;
//! ```
//!
//! ## Shutdown
//!
//! 1. Wait for every registration to settle
//! 2. Drop the deployment, which closes the engine's channel
//! 3. Await the engine task, which returns what it recorded
//!
//! Any other clone of the deployment keeps the channel open, so programs must not hold on
//! to one past [`SampleSystem::shutdown`].

use crate::engine::{EngineState, LocalEngine};
use iac_framework::{Deployment, DeploymentSettings, Error, Result};
use tokio::task::JoinHandle;
use tracing::info;

const ENGINE_BUFFER: usize = 32;

pub struct SampleSystem {
    pub deployment: Deployment,
    engine: JoinHandle<EngineState>,
}

impl SampleSystem {
    pub fn new(settings: DeploymentSettings) -> Self {
        let (engine, client) = LocalEngine::new(settings.clone(), ENGINE_BUFFER);
        let engine = tokio::spawn(engine.run());
        let deployment = Deployment::new(client, settings);
        Self { deployment, engine }
    }

    /// Settles outstanding registrations, stops the engine and returns its state.
    pub async fn shutdown(self) -> Result<EngineState> {
        let settled = self.deployment.wait_for_registrations().await;
        drop(self.deployment);
        let state = self
            .engine
            .await
            .map_err(|e| Error::Output(e.to_string()))?;
        settled?;
        info!(resources = state.resources.len(), "System shut down");
        Ok(state)
    }
}
