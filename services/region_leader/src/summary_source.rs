//! Resource summary sources

use dcop::{DcopError, ResourceSummary, ResourceSummaryProvider};
use std::fs;
use std::path::PathBuf;
use tracing::trace;
use types::RegionIdentifier;

/// Re-reads a JSON summary from disk every round, so whatever produces the
/// file can update it between rounds.
#[derive(Debug, Clone)]
pub struct FileSummaryProvider {
    path: PathBuf,
}

impl FileSummaryProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResourceSummaryProvider for FileSummaryProvider {
    fn region_summary(&self) -> dcop::Result<ResourceSummary> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| DcopError::summary_unavailable(format!("{}: {}", self.path.display(), e)))?;
        let summary = ResourceSummary::from_json(&text)
            .map_err(|e| DcopError::summary_unavailable(format!("{}: {}", self.path.display(), e)))?;
        trace!(path = %self.path.display(), services = summary.server_demand.len(), "summary loaded");
        Ok(summary)
    }
}

/// No demand and no capacity: every round produces the default plan
#[derive(Debug, Clone)]
pub struct EmptySummaryProvider {
    region: RegionIdentifier,
}

impl EmptySummaryProvider {
    pub fn new(region: RegionIdentifier) -> Self {
        Self { region }
    }
}

impl ResourceSummaryProvider for EmptySummaryProvider {
    fn region_summary(&self) -> dcop::Result<ResourceSummary> {
        Ok(ResourceSummary::new(self.region.clone()))
    }
}
