//! Sample resource types.
//!
//! - [`Widget`] - a custom resource with computed outputs and a `describe` method
//! - [`SampleProvider`] - the provider resource for the `sample` package
//! - [`Network`] - a component grouping widgets
//! - [`Tier`] and [`WidgetStatus`] - an enum and a record used in widget properties

pub mod network;
pub mod provider;
pub mod status;
pub mod tier;
pub mod widget;

pub use network::*;
pub use provider::*;
pub use status::*;
pub use tier::*;
pub use widget::*;
