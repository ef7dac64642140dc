//! Where published plans go

use anyhow::Result;
use dcop::RegionPlan;
use tokio::sync::watch;
use tracing::info;

/// Consumer of plans that differ from the previously published one
pub trait PlanSink: Send + Sync {
    fn publish(&self, plan: &RegionPlan) -> Result<()>;
}

/// Writes each plan to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPlanSink;

impl PlanSink for LoggingPlanSink {
    fn publish(&self, plan: &RegionPlan) -> Result<()> {
        for (service, fractions) in &plan.services {
            let routing: Vec<String> = fractions
                .iter()
                .map(|(region, fraction)| format!("{region}={fraction:.3}"))
                .collect();
            info!(region = %plan.region, %service, routing = %routing.join(","), "plan");
        }
        Ok(())
    }
}

/// Latest plan for in-process consumers
impl PlanSink for watch::Sender<Option<RegionPlan>> {
    fn publish(&self, plan: &RegionPlan) -> Result<()> {
        self.send_replace(Some(plan.clone()));
        Ok(())
    }
}
