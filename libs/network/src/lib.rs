//! Region-Leader Network Infrastructure
//!
//! - [`topology`]: graph of regions or nodes, neighbor sets and shortest paths
//! - [`discovery`]: who leads a region and where a node listens
//! - [`peer`]: handshaken TCP links to neighbor leaders and the manager that
//!   owns them
//!
//! Wire layout is defined by the `codec` crate; this crate owns sockets,
//! tasks and failure recovery.

pub mod discovery;
pub mod error;
pub mod peer;
pub mod topology;

pub use discovery::{LeaderOracle, NodeLookupService, StaticLeaderOracle, StaticNodeLookup};
pub use error::{Result, TransportError};
pub use peer::{
    BroadcastReport, NeighborInfo, NonceSource, PeerConnection, PeerManager,
    PeerSettings, RandomNonces, SharedPayload,
};
pub use topology::{OverlayTopology, RegionalTopology, Topology, TopologyError, TopologyService};
