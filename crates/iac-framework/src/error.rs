//! # Framework Errors
//!
//! This module defines the error type shared by the output engine, the registration
//! protocol and the conversion layer. The enum is `Clone` because a single failure is
//! fanned out to every task awaiting an output.
//!
//! Errors fall into four classes:
//!
//! - **Structural shape errors** ([`Error::InvalidShape`]) are fatal and raised before any value
//!   is converted.
//! - **Value mismatches** never surface here. They are downgraded to warnings by the
//!   converter and replaced with a default or an invalid marker.
//! - **Protocol errors** ([`Error::Rpc`], [`Error::MonitorClosed`], [`Error::MonitorDropped`])
//!   fail only the in-flight resource or call.
//! - **Configuration errors** ([`Error::InvalidArgument`], [`Error::TransformationChangedParent`],
//!   [`Error::ConflictingProviders`]) are returned synchronously, before any request is sent.

/// Errors that can occur within the SDK core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{context} contains invalid type {type_name}: {reason}")]
    InvalidShape {
        context: String,
        type_name: String,
        reason: String,
    },
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
    #[error("Transformations cannot be used to change the 'parent' of resource {resource}")]
    TransformationChangedParent { resource: String },
    #[error("Do not supply both 'provider' and 'providers' options to component {resource}")]
    ConflictingProviders { resource: String },
    #[error("Monitor closed")]
    MonitorClosed,
    #[error("Monitor dropped response channel")]
    MonitorDropped,
    #[error("{operation} failed: {message}")]
    Rpc { operation: String, message: String },
    #[error("Registration of {resource} failed: {reason}")]
    RegistrationFailed { resource: String, reason: String },
    #[error("Output '{0}' was already resolved")]
    AlreadyResolved(String),
    #[error("Call to {token} failed: {failures}")]
    CallFailed { token: String, failures: String },
    #[error("Conversion of {context} failed: {reason}")]
    Conversion { context: String, reason: String },
    #[error("Output computation failed: {0}")]
    Output(String),
}

impl Error {
    /// Shorthand for a failed engine exchange.
    pub fn rpc(operation: impl Into<String>, message: impl ToString) -> Self {
        Error::Rpc {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_argument(name: &str, reason: &str) -> Self {
        Error::InvalidArgument {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
