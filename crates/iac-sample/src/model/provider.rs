//! The provider for the `sample` package.

use iac_framework::serialization::{InputMap, InputValue, ResourceArgs};
use iac_framework::{Deployment, Output, OutputSlots, Resource, ResourceOptions, Result};

pub const PACKAGE: &str = "sample";

#[derive(Debug, Clone, Default)]
pub struct SampleProviderArgs {
    pub region: Option<String>,
}

impl ResourceArgs for SampleProviderArgs {
    fn to_inputs(&self) -> InputMap {
        self.region
            .iter()
            .map(|region| ("region".to_string(), InputValue::from(region.as_str())))
            .collect()
    }
}

/// An explicitly configured `pulumi:providers:sample` resource.
///
/// Pass it as `provider` to a widget, or in `providers` of a component so every widget
/// below it uses it.
#[derive(Debug, Clone)]
pub struct SampleProvider {
    pub resource: Resource,
    pub region: Output<Option<String>>,
}

impl SampleProvider {
    pub fn new(
        deployment: &Deployment,
        name: &str,
        args: &SampleProviderArgs,
        options: ResourceOptions,
    ) -> Result<Self> {
        let mut outputs = OutputSlots::new();
        let region = outputs.declare("region")?;
        let resource = deployment.register_provider(PACKAGE, name, args, options, outputs)?;
        Ok(Self { resource, region })
    }
}
