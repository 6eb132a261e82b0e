//! # IaC Sample
//!
//! Runs a small program against the in-process engine:
//!
//! 1. A [`SampleProvider`] for the `sample` package
//! 2. A [`Network`] component with two widgets that inherit that provider
//! 3. A premium [`Widget`] that depends on the network, and a `describe` call on it
//!
//! The stack outputs and the engine's final state are printed at the end.
//!
//! ```bash
//! RUST_LOG=info cargo run -p iac-sample
//! IAC_DRY_RUN=true RUST_LOG=info cargo run -p iac-sample   # preview: computed values stay unknown
//! ```

use iac_framework::serialization::{InputMap, InputValue};
use iac_framework::tracing::setup_tracing;
use iac_framework::{Asset, DeploymentSettings, Error, Output, ResourceOptions};
use iac_sample::lifecycle::SampleSystem;
use iac_sample::model::{Network, SampleProvider, SampleProviderArgs, Tier, Widget, WidgetArgs};
use std::collections::BTreeMap;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let settings = DeploymentSettings::from_env();
    info!(project = %settings.project, stack = %settings.stack, preview = settings.dry_run, "Starting deployment");
    let system = SampleSystem::new(settings);

    let result = system
        .deployment
        .run(|deployment| async move {
            let provider = SampleProvider::new(
                &deployment,
                "west",
                &SampleProviderArgs {
                    region: Some("us-west-2".into()),
                },
                ResourceOptions::default(),
            )?;

            let network = Network::new(
                &deployment,
                "net",
                2,
                ResourceOptions {
                    providers: vec![provider.resource.clone()],
                    ..ResourceOptions::default()
                },
            )
            .await?;

            let api = Widget::new(
                &deployment,
                "api",
                &WidgetArgs {
                    size: Some(Output::create(3)),
                    tier: Some(Tier::Premium),
                    labels: BTreeMap::from([("team".to_string(), "core".to_string())]),
                    code: Some(Asset::String("print('hello')".into())),
                },
                ResourceOptions {
                    provider: Some(provider.resource.clone()),
                    depends_on: vec![network.resource.clone()],
                    ..ResourceOptions::default()
                },
            )?;
            let description = api.describe(&deployment)?;
            let replicas = api.status.map(|status| status.replicas);

            Ok::<_, Error>(InputMap::from([
                ("apiEndpoint".to_string(), InputValue::from(api.endpoint.clone())),
                ("description".to_string(), InputValue::from(description)),
                ("replicas".to_string(), InputValue::from(replicas)),
                ("endpoints".to_string(), InputValue::from(network.endpoints.clone())),
            ]))
        })
        .await;

    if let Err(e) = &result {
        error!(error = %e, "Deployment failed");
    }
    let warnings = system.deployment.warnings();
    let state = system.shutdown().await.map_err(|e| e.to_string())?;

    for resource in state.resources.values() {
        info!(urn = %resource.urn, id = %resource.id, "Resource");
    }
    for warning in warnings {
        info!(%warning, "Conversion warning");
    }
    let outputs = serde_json::to_string_pretty(&state.component_outputs).map_err(|e| e.to_string())?;
    println!("{outputs}");

    result.map_err(|e| e.to_string())
}
