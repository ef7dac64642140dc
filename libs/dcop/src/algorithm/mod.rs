//! DCOP algorithm capability
//!
//! A variant is anything that turns this round's [`ResourceSummary`] and the
//! latest state heard from neighbors into a [`RegionPlan`] plus the state to
//! publish next. The driver does not care which variant it runs.

mod baseline;
pub mod inference;

pub use baseline::{BaselineAlgorithm, RoundReport};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use types::RegionIdentifier;

use crate::error::Result;
use crate::plan::RegionPlan;
use crate::shared::DcopSharedInformation;
use crate::summary::ResourceSummary;

/// Latest shared state per region, the local region included
pub type Inbox = HashMap<RegionIdentifier, DcopSharedInformation>;

/// Result of one round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutput {
    pub plan: RegionPlan,
    /// State to broadcast to neighbors
    pub outbox: DcopSharedInformation,
}

pub trait DcopAlgorithm: Send {
    fn name(&self) -> &'static str;

    fn compute_plan(&mut self, summary: &ResourceSummary, inbox: &Inbox) -> Result<RoundOutput>;
}

/// How much of the region's compute the algorithm is allowed to hand out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacitySettings {
    /// Fraction of capacity usable before the region counts as overloaded
    pub capacity_threshold: f64,
    /// Capacity reserved for every service beyond the first
    pub min_service_capacity: f64,
}

impl Default for CapacitySettings {
    fn default() -> Self {
        Self {
            capacity_threshold: 0.8,
            min_service_capacity: 1.0,
        }
    }
}
