//! Method calls on resources.

use super::Deployment;
use crate::error::{Error, Result};
use crate::monitor::ResourceCallRequest;
use crate::output::{Output, OutputData};
use crate::resource::{CallOptions, Resource};
use crate::serialization::{
    convert_value, serialize_properties, InputMap, InputValue, Marshal, ResourceArgs, Value,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Input key carrying the resource a method is called on.
const SELF_ARG: &str = "__self__";

impl Deployment {
    /// Calls the method `token`, optionally on `self_resource`, and converts the returned
    /// property map into `T`.
    ///
    /// Calls may be repeated and never touch the registration state of `self_resource`.
    /// The result depends on every resource the engine lists as a return dependency.
    pub fn call<T: Marshal>(
        &self,
        token: &str,
        args: &impl ResourceArgs,
        self_resource: Option<&Resource>,
        options: CallOptions,
    ) -> Result<Output<T>> {
        if token.is_empty() {
            return Err(Error::invalid_argument("token", "must not be empty"));
        }
        T::shape().validate(token)?;

        let mut inputs = args.to_inputs();
        if let Some(resource) = self_resource {
            inputs.insert(SELF_ARG.to_string(), InputValue::Resource(resource.clone()));
        }
        let provider = options.provider.clone().or_else(|| {
            self_resource
                .or(options.parent.as_ref())
                .and_then(|owner| self.arena().provider_for(owner.key(), token))
        });

        let deployment = self.clone();
        let token = token.to_string();
        let handle = tokio::spawn(async move {
            deployment
                .exchange_call::<T>(&token, inputs, provider, options)
                .await
        });
        Ok(Output::from_future(async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::Output(e.to_string())),
            }
        }))
    }

    #[tracing::instrument(skip(self, inputs, provider, options))]
    async fn exchange_call<T: Marshal>(
        &self,
        token: &str,
        inputs: InputMap,
        provider: Option<Resource>,
        options: CallOptions,
    ) -> Result<OutputData<T>> {
        let (keep_secrets, keep_resources) = self.serialization_features().await?;
        let serialized = serialize_properties(token, &inputs, keep_resources, keep_secrets).await?;

        let mut arg_dependencies = BTreeMap::new();
        for (name, keys) in &serialized.property_dependencies {
            let urns = self.dependency_urns(keys.iter().copied(), None).await?;
            if !urns.is_empty() {
                arg_dependencies.insert(name.clone(), urns);
            }
        }
        let provider = match &provider {
            Some(provider) => self.provider_reference(provider).await?,
            None => String::new(),
        };

        let request = ResourceCallRequest {
            tok: token.to_string(),
            args: serialized.object,
            arg_dependencies,
            provider,
            version: options.version.unwrap_or_default(),
            plugin_download_url: options.plugin_download_url.unwrap_or_default(),
            package_ref: options.package_ref.unwrap_or_default(),
            accept_resources: keep_resources,
        };
        info!("Calling method");
        debug!(?request, "Call request");
        let response = {
            let _permit = self.permit().await;
            self.monitor().call(request).await?
        };
        debug!(?response, "Call response");

        if !response.failures.is_empty() {
            let failures = response
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.property, f.reason))
                .collect::<Vec<_>>()
                .join("; ");
            warn!(%failures, "Call reported check failures");
            return Err(Error::CallFailed {
                token: token.to_string(),
                failures,
            });
        }

        let resources: BTreeSet<_> = response
            .return_dependencies
            .values()
            .flatten()
            .map(|urn| self.resource_for_urn(urn).key())
            .collect();
        let report = |message: String| self.warn(message);
        let data = convert_value::<T>(
            &report,
            token,
            &Value::Object(response.return_values),
            self,
            resources,
        )?;
        info!(known = data.is_known(), "Call returned");
        Ok(data)
    }
}
