use codec::DEFAULT_MAX_FIELD_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts and limits for peer links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSettings {
    /// Bound on establishing the TCP connection
    pub connect_timeout: Duration,
    /// Bound on receiving the peer's hello after sending ours
    pub handshake_timeout: Duration,
    /// Bound on writing one message to a peer
    pub write_timeout: Duration,
    /// Delay before re-creating a failed listen socket
    pub listen_retry_delay: Duration,
    /// Largest accepted field on the wire
    pub max_field_size: usize,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            listen_retry_delay: Duration::from_secs(1),
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
        }
    }
}
