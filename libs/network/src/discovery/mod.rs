//! Leader and Address Discovery
//!
//! The peer manager never caches who leads a region or where a node listens.
//! Both are looked up through these traits on every refresh, so leadership
//! changes and address moves take effect on the next round.

mod static_discovery;

pub use static_discovery::{StaticLeaderOracle, StaticNodeLookup};

use std::net::SocketAddr;
use types::{NodeIdentifier, RegionIdentifier};

/// Maps a region to the node currently acting as its DCOP leader
pub trait LeaderOracle: Send + Sync {
    fn dcop_leader(&self, region: &RegionIdentifier) -> Option<NodeIdentifier>;
}

/// Maps a node to the address its DCOP listener is reachable on
pub trait NodeLookupService: Send + Sync {
    fn resolve(&self, node: &NodeIdentifier) -> Option<SocketAddr>;
}
