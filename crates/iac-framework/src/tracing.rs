//! # Tracing Configuration
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate. Log levels are
//! controlled with `RUST_LOG`; the format is compact and hides module paths.
//!
//! ## What Gets Traced
//!
//! - **Registrations**: one `info` line when a resource is sent and one when it settles
//! - **Reads, calls and stack outputs**: the same pattern
//! - **Payloads**: full request and response bodies at `debug`
//! - **Failures**: `warn` lines carrying the resource and the reason
//! - **Value mismatches**: `warn` lines from the conversion layer, with the property path
//!
//! ```bash
//! # Compact logs
//! RUST_LOG=info cargo run -p iac-sample
//!
//! # Request and response payloads
//! RUST_LOG=debug cargo run -p iac-sample
//!
//! # Only the registration orchestrator
//! RUST_LOG=iac_framework::deployment=debug cargo run -p iac-sample
//! ```
//!
//! With `RUST_LOG=info`:
//!
//! ```text
//!  INFO registration{resource_type="sample:index:Widget" name="w1"}: Registering resource
//!  INFO registration{resource_type="sample:index:Widget" name="w1"}: Registered resource urn=urn:pulumi:dev::sample::sample:index:Widget::w1
//!  WARN Expected int but got string deserializing WidgetStatus(replicas)
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
