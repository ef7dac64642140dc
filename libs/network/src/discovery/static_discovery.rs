//! Table-backed discovery, populated from configuration

use super::{LeaderOracle, NodeLookupService};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::debug;
use types::{NodeIdentifier, RegionIdentifier};

/// Region → leader table that can be updated while the manager runs
#[derive(Debug, Default)]
pub struct StaticLeaderOracle {
    leaders: RwLock<HashMap<RegionIdentifier, NodeIdentifier>>,
}

impl StaticLeaderOracle {
    pub fn new(leaders: impl IntoIterator<Item = (RegionIdentifier, NodeIdentifier)>) -> Self {
        Self {
            leaders: RwLock::new(leaders.into_iter().collect()),
        }
    }

    /// Record a leadership change
    pub fn set_leader(&self, region: RegionIdentifier, node: NodeIdentifier) {
        debug!(region = %region, node = %node, "leader updated");
        self.leaders.write().insert(region, node);
    }
}

impl LeaderOracle for StaticLeaderOracle {
    fn dcop_leader(&self, region: &RegionIdentifier) -> Option<NodeIdentifier> {
        self.leaders.read().get(region).cloned()
    }
}

/// Node → address table that can be updated while the manager runs
#[derive(Debug, Default)]
pub struct StaticNodeLookup {
    addresses: RwLock<HashMap<NodeIdentifier, SocketAddr>>,
}

impl StaticNodeLookup {
    pub fn new(addresses: impl IntoIterator<Item = (NodeIdentifier, SocketAddr)>) -> Self {
        Self {
            addresses: RwLock::new(addresses.into_iter().collect()),
        }
    }

    pub fn set_address(&self, node: NodeIdentifier, address: SocketAddr) {
        debug!(node = %node, address = %address, "node address updated");
        self.addresses.write().insert(node, address);
    }
}

impl NodeLookupService for StaticNodeLookup {
    fn resolve(&self, node: &NodeIdentifier) -> Option<SocketAddr> {
        self.addresses.read().get(node).copied()
    }
}
