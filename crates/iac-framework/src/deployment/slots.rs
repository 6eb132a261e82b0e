//! Declared output properties of a resource.

use super::Deployment;
use crate::error::{Error, Result};
use crate::output::{CompletionSlot, Output, OutputData, ResourceId};
use crate::serialization::{convert_value, Marshal, Value};
use std::collections::{BTreeSet, HashSet};

/// A completion slot with its target type erased.
pub(crate) trait PropertySlot: Send + Sync {
    fn name(&self) -> &str;

    fn is_resolved(&self) -> bool;

    /// Converts the engine's value for this property and resolves the slot with it. An
    /// omitted property resolves to unknown.
    fn resolve_value(
        &self,
        deployment: &Deployment,
        context: &str,
        value: Option<&Value>,
        resources: BTreeSet<ResourceId>,
    ) -> Result<()>;

    fn fail(&self, error: Error) -> Result<()>;
}

struct TypedSlot<T>(CompletionSlot<T>);

impl<T: Marshal> PropertySlot for TypedSlot<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn is_resolved(&self) -> bool {
        self.0.is_resolved()
    }

    fn resolve_value(
        &self,
        deployment: &Deployment,
        context: &str,
        value: Option<&Value>,
        resources: BTreeSet<ResourceId>,
    ) -> Result<()> {
        let data = match value {
            Some(value) => {
                let warn = |message: String| deployment.warn(message);
                convert_value::<T>(&warn, context, value, deployment, resources)?
            }
            None => OutputData::unknown().with_resources(resources),
        };
        self.0.resolve(data)
    }

    fn fail(&self, error: Error) -> Result<()> {
        self.0.fail(error)
    }
}

/// The output properties a resource type declares.
///
/// Each declared property hands back the [`Output`] that resolves once the engine answers
/// the registration.
#[derive(Default)]
pub struct OutputSlots {
    slots: Vec<Box<dyn PropertySlot>>,
    names: HashSet<String>,
}

impl OutputSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the property `name` of type `T`.
    ///
    /// Fails if `T`'s shape is not marshalable or the name is declared twice.
    pub fn declare<T: Marshal>(&mut self, name: &str) -> Result<Output<T>> {
        T::shape().validate(name)?;
        if !self.names.insert(name.to_string()) {
            return Err(Error::invalid_argument(name, "output declared twice"));
        }
        let (slot, output) = CompletionSlot::new(name);
        self.slots.push(Box::new(TypedSlot(slot)));
        Ok(output)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &dyn PropertySlot> {
        self.slots.iter().map(|slot| slot.as_ref())
    }
}

impl std::fmt::Debug for OutputSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|slot| slot.name()))
            .finish()
    }
}
