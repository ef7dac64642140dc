//! Assembling a region leader from configuration

use anyhow::{bail, Context, Result};
use dcop::{BaselineAlgorithm, DcopAlgorithm, DcopSharedInformation, ResourceSummaryProvider};
use leader_config::LeaderConfig;
use network::{PeerManager, TopologyService};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::driver::RoundDriver;
use crate::plan_sink::PlanSink;
use crate::summary_source::{EmptySummaryProvider, FileSummaryProvider};

/// Algorithm variant named in `dcop.algorithm`
pub fn build_algorithm(config: &LeaderConfig) -> Result<Box<dyn DcopAlgorithm>> {
    match config.dcop.algorithm.as_str() {
        "baseline" => Ok(Box::new(BaselineAlgorithm::new(
            config.region(),
            Arc::new(config.catalog()),
            config.capacity_settings(),
        ))),
        other => bail!("unknown DCOP algorithm {other:?}"),
    }
}

pub struct RegionLeader {
    peers: PeerManager<DcopSharedInformation>,
    driver: RoundDriver,
    interval: Duration,
}

impl RegionLeader {
    pub fn from_config(config: &LeaderConfig, sink: Arc<dyn PlanSink>) -> Result<Self> {
        let topology = Arc::new(TopologyService::new(config.topology()?));
        let peers = PeerManager::new(
            config.region(),
            config.node(),
            topology,
            Arc::new(config.leader_oracle()),
            Arc::new(config.node_lookup()?),
            config.peer_settings(),
        );

        let summaries: Arc<dyn ResourceSummaryProvider> = match &config.summary_file {
            Some(path) => Arc::new(FileSummaryProvider::new(path)),
            None => Arc::new(EmptySummaryProvider::new(config.region())),
        };
        let driver = RoundDriver::new(peers.clone(), build_algorithm(config)?, summaries, sink);

        Ok(Self {
            peers,
            driver,
            interval: config.round_interval(),
        })
    }

    pub fn peers(&self) -> &PeerManager<DcopSharedInformation> {
        &self.peers
    }

    /// Listen, run rounds until `shutdown`, then close every peer link
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.peers.start().await.context("Failed to start peer manager")?;
        info!(region = %self.peers.region(), addr = %addr, "region leader running");

        self.driver.run(self.interval, shutdown).await;
        self.peers.stop().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_sink::LoggingPlanSink;

    const CONFIG: &str = r#"
[leader]
region = "A"
node = "a1"

[dcop]
round_interval_ms = 500

[topology]
links = [{ a = "A", b = "B" }]

[[nodes]]
name = "a1"
address = "127.0.0.1:0"

[[leaders]]
region = "A"
node = "a1"

[[services]]
service = "web"
priority = 3
"#;

    #[test]
    fn test_baseline_is_built_by_name() {
        let config = LeaderConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(build_algorithm(&config).unwrap().name(), "baseline");
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let mut config = LeaderConfig::from_toml_str(CONFIG).unwrap();
        config.dcop.algorithm = "simulated-annealing".to_string();
        assert!(build_algorithm(&config).is_err());
    }

    #[tokio::test]
    async fn test_leader_runs_until_shutdown() {
        let config = LeaderConfig::from_toml_str(CONFIG).unwrap();
        let leader = RegionLeader::from_config(&config, Arc::new(LoggingPlanSink)).unwrap();
        let peers = leader.peers().clone();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(leader.run(shutdown.clone()));

        tokio::time::timeout(Duration::from_secs(5), async {
            while !peers.inbox().contains_key(&config.region()) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("first round did not run");

        shutdown.cancel();
        task.await.unwrap().unwrap();
        assert!(!peers.is_running());
    }
}
