//! Resource behaviour behind the local engine.

use super::error::EngineError;
use super::StoredResource;
use crate::model::widget::{DESCRIBE_METHOD, WIDGET_TYPE};
use async_trait::async_trait;
use iac_framework::monitor::{CallResponse, CheckFailure, PropertyMap};
use iac_framework::serialization::Value;
use std::collections::BTreeMap;

/// Computes resource state and answers method calls for the engine.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Computes the state of a new resource from its inputs. During a preview, properties
    /// only known after creation come back unknown.
    async fn create(
        &self,
        resource_type: &str,
        name: &str,
        inputs: &PropertyMap,
        preview: bool,
    ) -> Result<PropertyMap, EngineError>;

    /// Runs the method `token`. `target` is the resource passed as `__self__`, if any.
    async fn call(
        &self,
        token: &str,
        args: &PropertyMap,
        target: Option<&StoredResource>,
    ) -> Result<CallResponse, EngineError>;
}

/// The `sample` package: widgets get an endpoint and a status, everything else echoes its
/// inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleResources;

fn plain(value: &Value) -> &Value {
    match value {
        Value::Secret(inner) => plain(inner),
        other => other,
    }
}

#[async_trait]
impl ResourceProvider for SampleResources {
    async fn create(
        &self,
        resource_type: &str,
        name: &str,
        inputs: &PropertyMap,
        preview: bool,
    ) -> Result<PropertyMap, EngineError> {
        let mut outputs = inputs.clone();
        if resource_type != WIDGET_TYPE {
            return Ok(outputs);
        }

        let size = match outputs.get("size").map(plain) {
            Some(Value::Number(size)) if *size < 0.0 => {
                return Err(EngineError::InvalidRequest(format!(
                    "widget {name} has negative size {size}"
                )))
            }
            Some(Value::Number(size)) => Value::Number(*size),
            Some(Value::Unknown) => Value::Unknown,
            _ => {
                outputs.insert("size".into(), Value::Number(1.0));
                Value::Number(1.0)
            }
        };
        if preview {
            outputs.insert("endpoint".into(), Value::Unknown);
            outputs.insert("status".into(), Value::Unknown);
        } else {
            outputs.insert(
                "endpoint".into(),
                Value::from(format!("{name}.sample.internal")),
            );
            outputs.insert(
                "status".into(),
                Value::object([("ready", Value::Bool(true)), ("replicaCount", size)]),
            );
        }
        Ok(outputs)
    }

    async fn call(
        &self,
        token: &str,
        _args: &PropertyMap,
        target: Option<&StoredResource>,
    ) -> Result<CallResponse, EngineError> {
        if token != DESCRIBE_METHOD {
            return Err(EngineError::UnknownMethod(token.to_string()));
        }
        let Some(target) = target.filter(|t| t.resource_type == WIDGET_TYPE) else {
            return Ok(CallResponse {
                failures: vec![CheckFailure {
                    property: "__self__".into(),
                    reason: "describe must be called on a widget".into(),
                }],
                ..CallResponse::default()
            });
        };

        let size = match target.outputs.get("size").map(plain) {
            Some(Value::Number(size)) => size.to_string(),
            _ => "unknown".to_string(),
        };
        let tier = target
            .outputs
            .get("tier")
            .map(plain)
            .and_then(Value::as_str)
            .unwrap_or("standard");
        let description = format!("{} is a {tier} widget of size {size}", target.name);

        Ok(CallResponse {
            return_values: BTreeMap::from([("description".to_string(), Value::from(description))]),
            return_dependencies: BTreeMap::from([(
                "description".to_string(),
                vec![target.urn.clone()],
            )]),
            failures: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget_inputs(size: Value) -> PropertyMap {
        BTreeMap::from([("size".to_string(), size)])
    }

    #[tokio::test]
    async fn widgets_get_endpoint_and_status() {
        let outputs = SampleResources
            .create(WIDGET_TYPE, "w1", &widget_inputs(Value::from(3)), false)
            .await
            .unwrap();

        assert_eq!(outputs["endpoint"], Value::from("w1.sample.internal"));
        assert_eq!(
            outputs["status"],
            Value::object([("ready", Value::Bool(true)), ("replicaCount", Value::from(3))])
        );
    }

    #[tokio::test]
    async fn preview_leaves_computed_properties_unknown() {
        let outputs = SampleResources
            .create(WIDGET_TYPE, "w1", &PropertyMap::new(), true)
            .await
            .unwrap();

        assert_eq!(outputs["size"], Value::from(1));
        assert_eq!(outputs["endpoint"], Value::Unknown);
    }

    #[tokio::test]
    async fn negative_sizes_are_rejected() {
        let result = SampleResources
            .create(WIDGET_TYPE, "w1", &widget_inputs(Value::from(-1)), false)
            .await;
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn describe_without_target_reports_failure() {
        let response = SampleResources
            .call(DESCRIBE_METHOD, &PropertyMap::new(), None)
            .await
            .unwrap();
        assert_eq!(response.failures.len(), 1);
        assert_eq!(response.failures[0].property, "__self__");

        let unknown = SampleResources
            .call("sample:index:Widget/explode", &PropertyMap::new(), None)
            .await;
        assert_eq!(
            unknown,
            Err(EngineError::UnknownMethod("sample:index:Widget/explode".into()))
        );
    }
}
