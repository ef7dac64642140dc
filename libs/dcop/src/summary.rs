//! Per-round resource summary of one region
//!
//! The summary is produced by the monitoring side of the system. Server
//! demand says how much compute each service consumes in this region and
//! which regions that load comes from. Network demand says which flows pass
//! through each neighbor link, which is how the algorithm attributes compute
//! to originating regions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use types::{RegionIdentifier, ServiceIdentifier};

use crate::error::Result;

/// Attributes measured on servers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeAttribute {
    TaskContainers,
    Cpu,
    Memory,
    QueueLength,
}

/// Attribute that capacity and demand are compared on
pub const COMPUTE_ATTRIBUTE: NodeAttribute = NodeAttribute::TaskContainers;

/// Attributes measured on links
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkAttribute {
    DatarateRx,
    DatarateTx,
    Delay,
}

impl LinkAttribute {
    /// Attributes that add up to the traffic volume of a flow
    pub const TRAFFIC: [LinkAttribute; 2] = [LinkAttribute::DatarateRx, LinkAttribute::DatarateTx];
}

/// Endpoints of a network flow as seen by a region
///
/// `source` is where the measurement was taken, `server` is the endpoint
/// hosting the service. The other endpoint is the client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionNetworkFlow {
    pub source: RegionIdentifier,
    pub destination: RegionIdentifier,
    pub server: RegionIdentifier,
}

impl RegionNetworkFlow {
    pub fn new(source: RegionIdentifier, destination: RegionIdentifier, server: RegionIdentifier) -> Self {
        Self {
            source,
            destination,
            server,
        }
    }

    /// Endpoint that is not the server, if the server is one of the endpoints
    pub fn client(&self) -> Option<&RegionIdentifier> {
        if self.source == self.server {
            Some(&self.destination)
        } else if self.destination == self.server {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// Traffic of one flow, broken down by service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDemand {
    pub flow: RegionNetworkFlow,
    #[serde(default)]
    pub services: BTreeMap<ServiceIdentifier, BTreeMap<LinkAttribute, f64>>,
}

/// Everything the algorithm needs to know about the local region this round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub region: RegionIdentifier,

    /// Total capacity of the region's servers
    #[serde(default)]
    pub server_capacity: BTreeMap<NodeAttribute, f64>,

    /// service → originating region → attribute → load
    #[serde(default)]
    pub server_demand: BTreeMap<ServiceIdentifier, BTreeMap<RegionIdentifier, BTreeMap<NodeAttribute, f64>>>,

    /// neighbor → flows observed on the link to that neighbor
    #[serde(default)]
    pub network_demand: BTreeMap<RegionIdentifier, Vec<FlowDemand>>,
}

impl ResourceSummary {
    pub fn new(region: RegionIdentifier) -> Self {
        Self {
            region,
            server_capacity: BTreeMap::new(),
            server_demand: BTreeMap::new(),
            network_demand: BTreeMap::new(),
        }
    }

    /// Capacity for one attribute, zero when not reported
    pub fn capacity(&self, attribute: NodeAttribute) -> f64 {
        self.server_capacity.get(&attribute).copied().unwrap_or(0.0)
    }

    pub fn with_capacity(mut self, attribute: NodeAttribute, value: f64) -> Self {
        self.server_capacity.insert(attribute, value);
        self
    }

    pub fn with_server_demand(
        mut self,
        service: ServiceIdentifier,
        source: RegionIdentifier,
        attribute: NodeAttribute,
        value: f64,
    ) -> Self {
        *self
            .server_demand
            .entry(service)
            .or_default()
            .entry(source)
            .or_default()
            .entry(attribute)
            .or_insert(0.0) += value;
        self
    }

    pub fn with_flow(
        mut self,
        neighbor: RegionIdentifier,
        flow: RegionNetworkFlow,
        service: ServiceIdentifier,
        attributes: impl IntoIterator<Item = (LinkAttribute, f64)>,
    ) -> Self {
        let flows = self.network_demand.entry(neighbor).or_default();
        let index = match flows.iter().position(|f| f.flow == flow) {
            Some(index) => index,
            None => {
                flows.push(FlowDemand {
                    flow,
                    services: BTreeMap::new(),
                });
                flows.len() - 1
            }
        };
        let per_service = flows[index].services.entry(service).or_default();
        for (attribute, value) in attributes {
            *per_service.entry(attribute).or_insert(0.0) += value;
        }
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Source of the summary for each round
pub trait ResourceSummaryProvider: Send + Sync {
    fn region_summary(&self) -> Result<ResourceSummary>;
}
