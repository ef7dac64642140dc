//! Topology Graph
//!
//! Undirected graph of regions (or overlay nodes) and the links between them.
//! A [`Topology`] is immutable once built. Changes arrive as a freshly built
//! graph that [`TopologyService::replace`] swaps in atomically, so readers
//! never observe a partially built graph.

mod error;
mod graph;
mod service;

pub use error::{Result, TopologyError};
pub use graph::{Topology, TopologyBuilder, DEFAULT_LINK_WEIGHT};
pub use service::TopologyService;

use types::{NodeIdentifier, RegionIdentifier};

/// Graph of regions
pub type RegionalTopology = Topology<RegionIdentifier>;

/// Graph of individual nodes
pub type OverlayTopology = Topology<NodeIdentifier>;
