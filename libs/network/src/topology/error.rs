//! Error types for the topology graph

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TopologyError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Link {link} has invalid weight {weight}: weights must be finite and non-negative")]
    InvalidWeight { link: String, weight: f64 },

    #[error("Link {link} connects a vertex to itself")]
    SelfLink { link: String },
}
