//! # Region Leader Configuration
//!
//! Loads everything a region leader needs to start from one TOML file,
//! with optional per-environment overrides and `DCOP_` environment
//! variables on top.
//!
//! ## Usage
//!
//! ```no_run
//! use leader_config::LeaderConfig;
//! use std::path::Path;
//!
//! let config = LeaderConfig::load(Path::new("config/leader.toml"), None)?;
//! let topology = config.topology()?;
//! let catalog = config.catalog();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod leader_config;

pub use leader_config::{
    DcopSection, LeaderConfig, LeaderEntry, LeaderSection, LinkEntry, NetworkSection, NodeEntry, TopologySection,
};
