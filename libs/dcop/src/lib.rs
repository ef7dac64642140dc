//! # DCOP Load Redistribution
//!
//! Data model and algorithms for moving excess service demand from
//! overloaded regions to regions with spare capacity.
//!
//! ## Pieces
//!
//! - [`summary`]: per-round resource summary (demand, flows, capacity)
//! - [`catalog`]: application metadata (priority, default region)
//! - [`rcdiff`]: load maps and protocol messages of the tree-based variant
//! - [`shared`]: what one region shares with its neighbors each round
//! - [`plan`]: the regional plan handed to traffic steering
//! - [`algorithm`]: the capability every variant implements, plus the
//!   sequential baseline
//!
//! The networking layer treats [`DcopSharedInformation`] as an opaque
//! payload; nothing here knows about sockets.

pub mod algorithm;
pub mod catalog;
pub mod error;
pub mod plan;
pub mod rcdiff;
pub mod shared;
pub mod summary;

pub use algorithm::{BaselineAlgorithm, CapacitySettings, DcopAlgorithm, Inbox, RoundOutput, RoundReport};
pub use catalog::{ApplicationCatalog, ApplicationSpec};
pub use error::{DcopError, Result};
pub use plan::{RegionPlan, ServicePlan};
pub use rcdiff::{AugmentedRoot, LoadKey, RcDiffLoadMap, RcDiffMessage, RcDiffMessageType, ServerClientService};
pub use shared::{DcopSharedInformation, ReceiverMessage};
pub use summary::{
    FlowDemand, LinkAttribute, NodeAttribute, RegionNetworkFlow, ResourceSummary, ResourceSummaryProvider,
    COMPUTE_ATTRIBUTE,
};

use std::collections::BTreeMap;
use types::{RegionIdentifier, ServiceIdentifier};

/// service → region → amount
pub type LoadTable = BTreeMap<ServiceIdentifier, BTreeMap<RegionIdentifier, f64>>;
