//! Validation errors for identifier construction

use thiserror::Error;

/// Errors raised when an identifier or link cannot be built
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Identifier string was empty or only whitespace
    #[error("{kind} identifier cannot be empty")]
    EmptyIdentifier { kind: &'static str },

    /// Both endpoints of a link are the same vertex
    #[error("link endpoints must differ (got {endpoint} twice)")]
    SelfLink { endpoint: String },
}
