//! The `sample:index:Network` component: a group of widgets with a combined endpoint list.

use super::{Widget, WidgetArgs};
use iac_framework::serialization::{InputMap, InputValue};
use iac_framework::{Deployment, Output, Resource, ResourceOptions, Result};
use tracing::{info, instrument};

pub const NETWORK_TYPE: &str = "sample:index:Network";

#[derive(Debug, Clone)]
pub struct Network {
    pub resource: Resource,
    pub widgets: Vec<Widget>,
    pub endpoints: Output<Vec<String>>,
}

impl Network {
    /// Registers the component and `count` child widgets of sizes `1..=count`, then
    /// registers the combined endpoint list as the component's outputs.
    #[instrument(skip(deployment, options))]
    pub async fn new(
        deployment: &Deployment,
        name: &str,
        count: usize,
        options: ResourceOptions,
    ) -> Result<Self> {
        let resource = deployment.register_component(NETWORK_TYPE, name, options)?;

        let mut widgets = Vec::with_capacity(count);
        for index in 0..count {
            let args = WidgetArgs {
                size: Some(Output::create(index as i32 + 1)),
                ..WidgetArgs::default()
            };
            let child = ResourceOptions {
                parent: Some(resource.clone()),
                ..ResourceOptions::default()
            };
            widgets.push(Widget::new(
                deployment,
                &format!("{name}-w{index}"),
                &args,
                child,
            )?);
        }

        let endpoints = Output::combine(widgets.iter().map(|w| w.endpoint.clone()));
        let outputs = InputMap::from([(
            "endpoints".to_string(),
            InputValue::from(endpoints.clone()),
        )]);
        deployment.register_outputs(&resource, outputs).await?;
        info!(widgets = widgets.len(), "Network ready");

        Ok(Self {
            resource,
            widgets,
            endpoints,
        })
    }
}
