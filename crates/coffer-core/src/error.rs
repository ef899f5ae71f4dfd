//! Error taxonomy shared by every vault service client.

use thiserror::Error;

use crate::model::ResourceKind;
use crate::poll::Classify;

/// Failures reported by the vault service.
///
/// `NotFound` doubles as the propagation signal: right after a delete or
/// recover, reads keep returning it until the new state is visible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The resource does not exist, or is not visible yet.
    #[error("{kind} not found: {name}")]
    NotFound { kind: ResourceKind, name: String },

    /// The caller may not perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request is malformed or violates a service rule.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service could not serve the request.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        ServiceError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

impl Classify for ServiceError {
    fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}
