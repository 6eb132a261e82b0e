//! Input tree to wire tree.
//!
//! Serializing awaits every output reachable from the value. An output that turns out
//! unknown becomes the unknown marker; the resources it depended on are collected either
//! way.

use super::property::{InputMap, InputValue};
use super::value::{ResourceReference, Value};
use crate::error::{Error, Result};
use crate::output::ResourceId;
use crate::resource::Resource;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, BTreeSet};

pub struct Serializer {
    keep_resources: bool,
    keep_secrets: bool,
    /// Every resource the serialized values depended on.
    pub dependent_resources: BTreeSet<ResourceId>,
}

impl Serializer {
    /// `keep_resources` and `keep_secrets` say whether the engine understands resource
    /// references and secret wrappers. Without them, resources serialize as their id (or
    /// URN for components) and secrets as plain values.
    pub fn new(keep_resources: bool, keep_secrets: bool) -> Self {
        Self {
            keep_resources,
            keep_secrets,
            dependent_resources: BTreeSet::new(),
        }
    }

    pub fn serialize<'a>(
        &'a mut self,
        context: &'a str,
        value: &'a InputValue,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            match value {
                InputValue::Null => Ok(Value::Null),
                InputValue::Bool(b) => Ok(Value::Bool(*b)),
                InputValue::Number(n) => Ok(Value::Number(*n)),
                InputValue::String(s) => Ok(Value::String(s.clone())),
                InputValue::Array(items) => {
                    let mut result = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        let item_context = format!("{context}[{index}]");
                        result.push(self.serialize(&item_context, item).await?);
                    }
                    Ok(Value::Array(result))
                }
                InputValue::Object(entries) => {
                    let mut result = BTreeMap::new();
                    for (key, entry) in entries {
                        let entry_context = format!("{context}.{key}");
                        let serialized = self.serialize(&entry_context, entry).await?;
                        if !serialized.is_null() {
                            result.insert(key.clone(), serialized);
                        }
                    }
                    Ok(Value::Object(result))
                }
                InputValue::Asset(asset) => asset.to_value().map_err(|e| in_context(context, e)),
                InputValue::Archive(archive) => {
                    archive.to_value().map_err(|e| in_context(context, e))
                }
                InputValue::Resource(resource) => self.serialize_resource(resource).await,
                InputValue::Output(output) => {
                    let data = output.resolve().await?;
                    self.dependent_resources.extend(data.resources);
                    let Some(inner) = data.value else {
                        return Ok(Value::Unknown);
                    };
                    let serialized = self.serialize(context, &inner).await?;
                    if data.is_secret && self.keep_secrets {
                        Ok(Value::secret(serialized))
                    } else {
                        Ok(serialized)
                    }
                }
            }
        }
        .boxed()
    }

    async fn serialize_resource(&mut self, resource: &Resource) -> Result<Value> {
        self.dependent_resources.insert(resource.key());
        let Some(urn) = resource.urn().resolve().await?.value else {
            return Ok(Value::Unknown);
        };
        let id = match resource.id() {
            Some(id) if resource.kind().is_custom() => Some(id.resolve().await?.value),
            _ => None,
        };

        if self.keep_resources {
            return Ok(Value::ResourceReference(ResourceReference {
                urn,
                // An unknown id travels as the empty string.
                id: id.map(Option::unwrap_or_default),
                package_version: resource.package_version().map(str::to_string),
            }));
        }
        match id {
            Some(Some(id)) => Ok(Value::String(id)),
            Some(None) => Ok(Value::Unknown),
            None => Ok(Value::String(urn)),
        }
    }
}

fn in_context(context: &str, error: Error) -> Error {
    match error {
        Error::Conversion { reason, .. } => Error::Conversion {
            context: context.to_string(),
            reason,
        },
        other => other,
    }
}

/// Top-level properties serialized for a request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SerializedProperties {
    pub object: BTreeMap<String, Value>,
    /// The resources each top-level property depended on. Present for every input key,
    /// including those that serialized to null.
    pub property_dependencies: BTreeMap<String, BTreeSet<ResourceId>>,
}

impl SerializedProperties {
    pub fn all_dependencies(&self) -> BTreeSet<ResourceId> {
        self.property_dependencies
            .values()
            .flatten()
            .copied()
            .collect()
    }
}

/// Serializes each top-level property separately so that dependencies stay per property.
/// Null values are dropped from the object.
pub async fn serialize_properties(
    context: &str,
    properties: &InputMap,
    keep_resources: bool,
    keep_secrets: bool,
) -> Result<SerializedProperties> {
    let mut result = SerializedProperties::default();
    for (key, value) in properties {
        let mut serializer = Serializer::new(keep_resources, keep_secrets);
        let property_context = format!("{context}.{key}");
        let serialized = serializer.serialize(&property_context, value).await?;
        if !serialized.is_null() {
            result.object.insert(key.clone(), serialized);
        }
        result
            .property_dependencies
            .insert(key.clone(), serializer.dependent_resources);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Output, OutputData};

    #[tokio::test]
    async fn unknown_outputs_keep_dependencies() {
        let unknown = Output::<InputValue>::from_data(
            OutputData::unknown().with_resources([ResourceId(4)]),
        );
        let args = InputMap::from([
            ("size".to_string(), InputValue::from(3)),
            ("name".to_string(), InputValue::Output(unknown)),
        ]);

        let serialized = serialize_properties("w1", &args, true, true).await.unwrap();
        assert_eq!(serialized.object["size"], Value::Number(3.0));
        assert_eq!(serialized.object["name"], Value::Unknown);
        assert!(serialized.property_dependencies["size"].is_empty());
        assert_eq!(
            serialized.property_dependencies["name"],
            BTreeSet::from([ResourceId(4)])
        );
    }

    #[tokio::test]
    async fn secrets_unwrap_without_engine_support() {
        let secret = InputValue::Output(Output::create_secret(InputValue::from("s3cr3t")));

        let mut keeping = Serializer::new(true, true);
        assert_eq!(
            keeping.serialize("p", &secret).await.unwrap(),
            Value::secret(Value::from("s3cr3t"))
        );

        let mut dropping = Serializer::new(true, false);
        assert_eq!(
            dropping.serialize("p", &secret).await.unwrap(),
            Value::from("s3cr3t")
        );
    }

    #[tokio::test]
    async fn invalid_assets_fail_with_context() {
        let value = InputValue::object([("code", InputValue::Asset(crate::asset::Asset::Invalid))]);
        let err = Serializer::new(true, true)
            .serialize("fn", &value)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conversion { ref context, .. } if context == "fn.code"));
    }
}
