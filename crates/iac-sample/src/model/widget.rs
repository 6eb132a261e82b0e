//! The `sample:index:Widget` custom resource.

use super::{Tier, WidgetStatus};
use iac_framework::serialization::{
    InputMap, InputValue, Marshal, Parameter, PropertyValue, RecordFields, ResourceArgs, Shape,
};
use iac_framework::{
    Asset, CallOptions, Deployment, Output, OutputSlots, Resource, ResourceOptions, Result,
};
use std::collections::BTreeMap;
use tracing::instrument;

pub const WIDGET_TYPE: &str = "sample:index:Widget";
pub const DESCRIBE_METHOD: &str = "sample:index:Widget/describe";

/// Inputs of a widget. Unset fields are left out of the request.
#[derive(Debug, Clone, Default)]
pub struct WidgetArgs {
    pub size: Option<Output<i32>>,
    pub tier: Option<Tier>,
    pub labels: BTreeMap<String, String>,
    pub code: Option<Asset>,
}

impl ResourceArgs for WidgetArgs {
    fn to_inputs(&self) -> InputMap {
        let mut inputs = InputMap::new();
        if let Some(size) = &self.size {
            inputs.insert("size".into(), InputValue::from(size.clone()));
        }
        if let Some(tier) = self.tier {
            inputs.insert("tier".into(), tier.to_input());
        }
        if !self.labels.is_empty() {
            let labels = self
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), InputValue::from(v.as_str())))
                .collect();
            inputs.insert("labels".into(), InputValue::Object(labels));
        }
        if let Some(code) = &self.code {
            inputs.insert("code".into(), InputValue::Asset(code.clone()));
        }
        inputs
    }
}

#[derive(Debug, Clone)]
pub struct Widget {
    pub resource: Resource,
    pub size: Output<i32>,
    pub tier: Output<Option<Tier>>,
    pub endpoint: Output<String>,
    pub status: Output<WidgetStatus>,
}

impl Widget {
    /// Registers a new widget.
    pub fn new(
        deployment: &Deployment,
        name: &str,
        args: &WidgetArgs,
        options: ResourceOptions,
    ) -> Result<Self> {
        let mut outputs = OutputSlots::new();
        let size = outputs.declare("size")?;
        let tier = outputs.declare("tier")?;
        let endpoint = outputs.declare("endpoint")?;
        let status = outputs.declare("status")?;
        let resource = deployment.register_custom(WIDGET_TYPE, name, args, options, outputs)?;
        Ok(Self {
            resource,
            size,
            tier,
            endpoint,
            status,
        })
    }

    /// Adopts an existing widget by provider id instead of creating one.
    pub fn get(
        deployment: &Deployment,
        name: &str,
        id: impl Into<Output<String>>,
        options: ResourceOptions,
    ) -> Result<Self> {
        let options = ResourceOptions {
            id: Some(id.into()),
            ..options
        };
        Self::new(deployment, name, &WidgetArgs::default(), options)
    }

    /// A one-line description computed by the engine.
    #[instrument(skip(self, deployment), fields(widget = %self.resource.name()))]
    pub fn describe(&self, deployment: &Deployment) -> Result<Output<String>> {
        let description = deployment.call::<WidgetDescription>(
            DESCRIBE_METHOD,
            &InputMap::new(),
            Some(&self.resource),
            CallOptions::default(),
        )?;
        Ok(description.map(|d| d.description))
    }
}

/// Result of [`Widget::describe`].
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDescription {
    pub description: String,
}

impl Marshal for WidgetDescription {
    fn shape() -> Shape {
        Shape::record("WidgetDescription", || {
            vec![Parameter::new::<String>("description")]
        })
    }

    fn from_property(value: PropertyValue) -> std::result::Result<Self, String> {
        let mut fields = RecordFields::new("WidgetDescription", value)?;
        Ok(Self {
            description: fields.take("description")?,
        })
    }

    fn to_input(&self) -> InputValue {
        InputValue::object([("description", self.description.to_input())])
    }
}
