//! Periodic DCOP round driver

use anyhow::{Context, Result};
use dcop::{DcopAlgorithm, DcopSharedInformation, RegionPlan, ResourceSummaryProvider};
use network::PeerManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::plan_sink::PlanSink;

/// What one round did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round: i32,
    /// Whether the plan differed from the last published one
    pub published: bool,
    /// Neighbors the new shared state reached
    pub delivered: usize,
}

pub struct RoundDriver {
    peers: PeerManager<DcopSharedInformation>,
    algorithm: Box<dyn DcopAlgorithm>,
    summaries: Arc<dyn ResourceSummaryProvider>,
    sink: Arc<dyn PlanSink>,
    last_plan: Option<RegionPlan>,
}

impl RoundDriver {
    pub fn new(
        peers: PeerManager<DcopSharedInformation>,
        algorithm: Box<dyn DcopAlgorithm>,
        summaries: Arc<dyn ResourceSummaryProvider>,
        sink: Arc<dyn PlanSink>,
    ) -> Self {
        Self {
            peers,
            algorithm,
            summaries,
            sink,
            last_plan: None,
        }
    }

    /// Most recently published plan
    pub fn last_plan(&self) -> Option<&RegionPlan> {
        self.last_plan.as_ref()
    }

    /// Run one round.
    ///
    /// Broadcast failures are logged and do not fail the round. A plan that
    /// could not be published is retried next round.
    #[instrument(skip(self), fields(region = %self.peers.region(), algorithm = self.algorithm.name()))]
    pub async fn run_round(&mut self) -> Result<RoundOutcome> {
        let summary = self
            .summaries
            .region_summary()
            .context("Failed to read resource summary")?;
        let inbox = self.peers.inbox();

        let output = self
            .algorithm
            .compute_plan(&summary, &inbox)
            .context("Failed to compute plan")?;
        let round = output.outbox.iteration();

        let delivered = match self.peers.broadcast(&output.outbox).await {
            Ok(report) => report.delivered.len(),
            Err(e) => {
                warn!(round, error = %e, "broadcast failed");
                0
            }
        };

        let published = self.last_plan.as_ref() != Some(&output.plan);
        if published {
            self.sink.publish(&output.plan).context("Failed to publish plan")?;
            info!(round, services = output.plan.services.len(), delivered, "plan published");
            self.last_plan = Some(output.plan);
        } else {
            debug!(round, delivered, "plan unchanged");
        }

        Ok(RoundOutcome {
            round,
            published,
            delivered,
        })
    }

    /// Run rounds every `interval` until `shutdown` is cancelled
    pub async fn run(mut self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_round().await {
                        error!("round failed: {:#}", e);
                    }
                }
            }
        }
        info!(region = %self.peers.region(), "round driver stopped");
    }
}
