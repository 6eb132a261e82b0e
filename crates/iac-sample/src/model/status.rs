use iac_framework::serialization::{InputValue, Marshal, Parameter, PropertyValue, RecordFields, Shape};

/// Status the engine reports for a widget.
///
/// `replicas` travels as `replicaCount`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WidgetStatus {
    pub ready: bool,
    pub replicas: i32,
}

impl Marshal for WidgetStatus {
    fn shape() -> Shape {
        Shape::record("WidgetStatus", || {
            vec![
                Parameter::new::<bool>("ready"),
                Parameter::renamed::<i32>("replicas", "replicaCount"),
            ]
        })
    }

    fn from_property(value: PropertyValue) -> Result<Self, String> {
        let mut fields = RecordFields::new("WidgetStatus", value)?;
        Ok(Self {
            ready: fields.take("ready")?,
            replicas: fields.take("replicas")?,
        })
    }

    fn to_input(&self) -> InputValue {
        InputValue::object([
            ("ready", self.ready.to_input()),
            ("replicaCount", self.replicas.to_input()),
        ])
    }
}
