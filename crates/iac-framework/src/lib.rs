//! # IaC Framework
//!
//! This crate is the client-side core of an infrastructure-as-code SDK. A program describes
//! the resources it wants; the crate registers them with an external deployment engine and
//! hands back their properties as asynchronous values.
//!
//! ## Architecture Overview
//!
//! Three layers, leaves first:
//!
//! 1. **Output engine** ([`Output`]) - values that may not exist yet, may be unknown during a
//!    preview, may be secret, and always know which resources they depend on
//! 2. **Registration** ([`Deployment`]) - resource identity, parent/child and provider
//!    inheritance, transformations, and one register (or read) exchange per resource
//! 3. **Conversion** ([`serialization`]) - the untyped wire tree on one side, typed host
//!    values described by a closed [`Shape`](serialization::Shape) on the other
//!
//! ```text
//! args with outputs ──serialize──▶ request ──▶ engine
//!                                                │
//! typed outputs ◀──convert── response ◀──────────┘
//! ```
//!
//! The engine is reached only through the [`Monitor`] trait. [`MonitorClient`] implements it
//! over a Tokio channel, so the transport (or an in-process engine, or a test double from
//! [`mock`]) lives on the other end of that channel.
//!
//! ## A Resource, End to End
//!
//! ```rust
//! use iac_framework::mock::MockMonitor;
//! use iac_framework::serialization::{InputMap, InputValue, Value};
//! use iac_framework::{Deployment, DeploymentSettings, Output, OutputSlots, ResourceOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     // 1. An engine that answers the registration
//!     let mock = MockMonitor::new();
//!     mock.expect_register("pkg:index:Widget", "w1").return_outputs(
//!         "w-123",
//!         [("endpoint".to_string(), Value::from("10.0.0.1"))].into(),
//!     );
//!
//!     // 2. Declare the outputs and register
//!     let deployment = Deployment::new(mock.client(), DeploymentSettings::default());
//!     let mut outputs = OutputSlots::new();
//!     let endpoint = outputs.declare::<String>("endpoint").unwrap();
//!     let args = InputMap::from([("size".to_string(), InputValue::from(Output::create(3)))]);
//!     let widget = deployment
//!         .register_custom("pkg:index:Widget", "w1", &args, ResourceOptions::default(), outputs)
//!         .unwrap();
//!
//!     // 3. Outputs resolve from the response and depend on the widget
//!     let data = endpoint.resolve().await.unwrap();
//!     assert_eq!(data.value.as_deref(), Some("10.0.0.1"));
//!     assert!(data.resources.contains(&widget.key()));
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Construction is synchronous; each registration exchange runs in its own Tokio task
//! - Parent and child registrations run concurrently; a child only waits for its parent's URN
//! - Output slots are single-assignment; a second resolution is rejected
//! - A failed registration fails every pending output of that resource, nothing else
//!
//! ## Testing
//!
//! [`mock::MockMonitor`] answers engine requests from declared expectations. See the
//! [`mock`] module for the patterns.

pub mod asset;
pub mod deployment;
pub mod error;
pub mod mock;
pub mod monitor;
pub mod output;
pub mod resource;
pub mod serialization;
pub mod settings;
pub mod tracing;

// Re-export core types for convenience
pub use asset::{Archive, Asset, AssetOrArchive};
pub use deployment::{Deployment, OutputSlots};
pub use error::{Error, Result};
pub use monitor::{Monitor, MonitorClient, MonitorRequest, Response};
pub use output::{CompletionSlot, Output, OutputData, OutputValue, ResourceId};
pub use resource::{
    Alias, AliasParent, AliasSpec, CallOptions, Resource, ResourceKind, ResourceOptions,
    ResourceTransformation, TransformationArgs, TransformationResult,
};
pub use serialization::{InputMap, InputValue, Marshal, PropertyValue, ResourceArgs, Union};
pub use settings::DeploymentSettings;
