//! Peer Networking Between Region Leaders
//!
//! One [`PeerManager`] per leader owns a table of [`PeerConnection`]s, one per
//! neighboring region's leader. Connections are established from both sides;
//! when two leaders dial each other at the same time the dialer nonce decides
//! which connection survives (see [`PeerManager`]).
//!
//! ```text
//! CONNECTING ──dial/accept──▶ HANDSHAKING ──hello exchanged──▶ ESTABLISHED
//!      │                            │                              │
//!      └──────── failure ───────────┴──── close / desync / stop ───┴──▶ TERMINATED
//! ```

mod connection;
mod handshake;
mod manager;
mod nonce;
mod settings;

pub use connection::PeerConnection;
pub use manager::{BroadcastReport, NeighborInfo, PeerManager};
pub use nonce::{NonceSource, RandomNonces};
pub use settings::PeerSettings;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Value exchanged between leaders each round.
///
/// A neighbor that has not sent anything yet has no inbox entry; callers
/// substitute their own neutral value.
pub trait SharedPayload:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}

impl<T> SharedPayload for T where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}
