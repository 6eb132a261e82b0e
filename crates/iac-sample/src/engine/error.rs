use thiserror::Error;

/// Failures raised while the local engine answers a request.
///
/// They reach the program as [`iac_framework::Error::Rpc`], with the message carried over.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Resource {0} is already registered")]
    DuplicateUrn(String),
    #[error("Resource {0} not found")]
    NotFound(String),
    #[error("Unknown method {0}")]
    UnknownMethod(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    pub fn into_rpc(self, operation: &str) -> iac_framework::Error {
        iac_framework::Error::rpc(operation, self)
    }
}
