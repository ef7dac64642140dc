//! Leader Configuration Module
//!
//! Loads the leader's identity, peer link settings, DCOP round settings,
//! the static region topology and discovery tables, and the application
//! catalog. Supports environment-specific override files and `DCOP_`
//! environment variables.

use anyhow::{bail, ensure, Context, Result};
use config_crate::{Config, Environment, File};
use dcop::{ApplicationCatalog, ApplicationSpec, CapacitySettings};
use network::{PeerSettings, RegionalTopology, StaticLeaderOracle, StaticNodeLookup, Topology};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use types::{NodeIdentifier, RegionIdentifier, RegionalLink};

use crate::defaults;

/// Main leader configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LeaderConfig {
    /// Who this process is
    pub leader: LeaderSection,

    #[serde(default)]
    pub network: NetworkSection,

    #[serde(default)]
    pub dcop: DcopSection,

    pub topology: TopologySection,

    /// Node name → listen address
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,

    /// Region → DCOP leader node
    #[serde(default)]
    pub leaders: Vec<LeaderEntry>,

    /// Application catalog
    #[serde(default)]
    pub services: Vec<ApplicationSpec>,

    /// JSON resource summary read at the start of every round
    pub summary_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LeaderSection {
    pub region: String,
    pub node: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NetworkSection {
    pub connect_timeout_ms: u64,
    pub handshake_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub listen_retry_delay_ms: u64,
    pub max_field_size: usize,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            connect_timeout_ms: defaults::network::CONNECT_TIMEOUT_MS,
            handshake_timeout_ms: defaults::network::HANDSHAKE_TIMEOUT_MS,
            write_timeout_ms: defaults::network::WRITE_TIMEOUT_MS,
            listen_retry_delay_ms: defaults::network::LISTEN_RETRY_DELAY_MS,
            max_field_size: codec_max_field_size(),
        }
    }
}

fn codec_max_field_size() -> usize {
    PeerSettings::default().max_field_size
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DcopSection {
    pub algorithm: String,
    pub round_interval_ms: u64,
    pub capacity_threshold: f64,
    pub min_service_capacity: f64,
}

impl Default for DcopSection {
    fn default() -> Self {
        Self {
            algorithm: defaults::dcop::ALGORITHM.to_string(),
            round_interval_ms: defaults::dcop::ROUND_INTERVAL_MS,
            capacity_threshold: defaults::dcop::CAPACITY_THRESHOLD,
            min_service_capacity: defaults::dcop::MIN_SERVICE_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TopologySection {
    /// Regions without links still take part
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LinkEntry {
    pub a: String,
    pub b: String,
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NodeEntry {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LeaderEntry {
    pub region: String,
    pub node: String,
}

impl LeaderConfig {
    /// Load configuration from a file with environment overrides
    ///
    /// `environment` selects `environments/<name>.toml` next to the base
    /// file. Variables such as `DCOP_LEADER__NODE` override single keys.
    pub fn load(base_path: &Path, environment: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(base_path).required(true));

        if let Some(env) = environment {
            let env_file = base_path
                .parent()
                .unwrap_or(Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(defaults::ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.expand_env_vars()?;
        config.validate()?;
        debug!(region = %config.leader.region, node = %config.leader.node, "configuration loaded");
        Ok(config)
    }

    /// Parse a TOML document without file or environment sources
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text).context("Failed to parse configuration")?;
        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in addresses and paths
    pub fn expand_env_vars(&mut self) -> Result<()> {
        for node in &mut self.nodes {
            let expanded = shellexpand::env(&node.address)
                .with_context(|| format!("Failed to expand address of node {}", node.name))?
                .into_owned();
            node.address = expanded;
        }

        if let Some(path) = &self.summary_file {
            let expanded = shellexpand::env(&path.to_string_lossy())
                .context("Failed to expand summary file path")?
                .to_string();
            self.summary_file = Some(PathBuf::from(expanded));
        }

        Ok(())
    }

    /// Reject configurations the leader cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.leader.region.trim().is_empty(), "leader.region must not be empty");
        ensure!(!self.leader.node.trim().is_empty(), "leader.node must not be empty");

        let regions: HashSet<&str> = self
            .topology
            .regions
            .iter()
            .map(String::as_str)
            .chain(self.topology.links.iter().flat_map(|l| [l.a.as_str(), l.b.as_str()]))
            .collect();
        ensure!(
            regions.contains(self.leader.region.as_str()),
            "leader region {} is not part of the topology",
            self.leader.region
        );

        let nodes: HashSet<&str> = self.nodes.iter().map(|n| n.name.as_str()).collect();
        ensure!(
            nodes.contains(self.leader.node.as_str()),
            "leader node {} has no address in [[nodes]]",
            self.leader.node
        );
        for entry in &self.leaders {
            if !regions.contains(entry.region.as_str()) {
                bail!("leader entry for unknown region {}", entry.region);
            }
        }

        let dcop = &self.dcop;
        ensure!(dcop.round_interval_ms > 0, "dcop.round_interval_ms must be positive");
        ensure!(
            dcop.capacity_threshold > 0.0 && dcop.capacity_threshold <= 1.0,
            "dcop.capacity_threshold must be in (0, 1], got {}",
            dcop.capacity_threshold
        );
        ensure!(
            dcop.min_service_capacity >= 0.0,
            "dcop.min_service_capacity must not be negative"
        );
        ensure!(self.network.max_field_size > 0, "network.max_field_size must be positive");

        self.node_addresses()?;
        self.topology()?;
        Ok(())
    }

    pub fn region(&self) -> RegionIdentifier {
        RegionIdentifier::new(self.leader.region.as_str())
    }

    pub fn node(&self) -> NodeIdentifier {
        NodeIdentifier::new(self.leader.node.as_str())
    }

    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.dcop.round_interval_ms)
    }

    pub fn peer_settings(&self) -> PeerSettings {
        PeerSettings {
            connect_timeout: Duration::from_millis(self.network.connect_timeout_ms),
            handshake_timeout: Duration::from_millis(self.network.handshake_timeout_ms),
            write_timeout: Duration::from_millis(self.network.write_timeout_ms),
            listen_retry_delay: Duration::from_millis(self.network.listen_retry_delay_ms),
            max_field_size: self.network.max_field_size,
        }
    }

    pub fn capacity_settings(&self) -> CapacitySettings {
        CapacitySettings {
            capacity_threshold: self.dcop.capacity_threshold,
            min_service_capacity: self.dcop.min_service_capacity,
        }
    }

    pub fn topology(&self) -> Result<RegionalTopology> {
        let mut builder = Topology::builder();
        for region in &self.topology.regions {
            builder = builder.vertex(RegionIdentifier::new(region.as_str()));
        }
        for entry in &self.topology.links {
            let link = RegionalLink::new(RegionIdentifier::new(entry.a.as_str()), RegionIdentifier::new(entry.b.as_str()));
            builder = match entry.weight {
                Some(weight) => builder.weighted_link(link, weight),
                None => builder.link(link),
            }
            .with_context(|| format!("Invalid topology link {} <-> {}", entry.a, entry.b))?;
        }
        Ok(builder.build())
    }

    pub fn node_addresses(&self) -> Result<Vec<(NodeIdentifier, SocketAddr)>> {
        self.nodes
            .iter()
            .map(|entry| {
                let address: SocketAddr = entry
                    .address
                    .parse()
                    .with_context(|| format!("Invalid address {:?} for node {}", entry.address, entry.name))?;
                Ok((NodeIdentifier::new(entry.name.as_str()), address))
            })
            .collect()
    }

    pub fn node_lookup(&self) -> Result<StaticNodeLookup> {
        Ok(StaticNodeLookup::new(self.node_addresses()?))
    }

    pub fn leader_oracle(&self) -> StaticLeaderOracle {
        StaticLeaderOracle::new(self.leaders.iter().map(|entry| {
            (
                RegionIdentifier::new(entry.region.as_str()),
                NodeIdentifier::new(entry.node.as_str()),
            )
        }))
    }

    pub fn catalog(&self) -> ApplicationCatalog {
        ApplicationCatalog::new(self.services.iter().cloned())
    }
}
