//! Default values shared by the configuration sections

/// Peer link defaults
pub mod network {
    /// Connection establishment timeout (milliseconds)
    pub const CONNECT_TIMEOUT_MS: u64 = 5_000;

    /// Hello exchange timeout (milliseconds)
    pub const HANDSHAKE_TIMEOUT_MS: u64 = 5_000;

    /// Single message write timeout (milliseconds)
    pub const WRITE_TIMEOUT_MS: u64 = 10_000;

    /// Delay before re-binding a failed listener (milliseconds)
    pub const LISTEN_RETRY_DELAY_MS: u64 = 1_000;
}

/// DCOP round defaults
pub mod dcop {
    /// Algorithm variant run by default
    pub const ALGORITHM: &str = "baseline";

    /// Time between rounds (milliseconds)
    pub const ROUND_INTERVAL_MS: u64 = 10_000;

    /// Fraction of capacity usable before a region is overloaded
    pub const CAPACITY_THRESHOLD: f64 = 0.8;

    /// Capacity reserved for each service beyond the first
    pub const MIN_SERVICE_CAPACITY: f64 = 1.0;
}

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "DCOP";
