//! Errors raised while computing a DCOP round

use thiserror::Error;
use types::RegionIdentifier;

pub type Result<T> = std::result::Result<T, DcopError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DcopError {
    /// Summary describes a different region than the algorithm runs for
    #[error("Summary is for region {actual}, expected {expected}")]
    SummaryRegionMismatch {
        expected: RegionIdentifier,
        actual: RegionIdentifier,
    },

    /// A demand or capacity value is negative, NaN or infinite
    #[error("Invalid {what} value {value}")]
    InvalidValue { what: String, value: f64 },

    /// The summary source could not produce a summary this round
    #[error("Resource summary unavailable: {message}")]
    SummaryUnavailable { message: String },
}

impl DcopError {
    pub fn invalid_value(what: impl Into<String>, value: f64) -> Self {
        Self::InvalidValue {
            what: what.into(),
            value,
        }
    }

    pub fn summary_unavailable(message: impl Into<String>) -> Self {
        Self::SummaryUnavailable {
            message: message.into(),
        }
    }
}
