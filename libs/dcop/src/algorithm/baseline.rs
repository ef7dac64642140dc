//! Sequential baseline variant
//!
//! Each region decides on its own: services are served in priority order
//! until the usable capacity runs out, and whatever does not fit becomes
//! excess. Excess is shed to the service's default region when it has one.
//! No negotiation with neighbors takes place; the published state only
//! carries the round number.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use types::{approx_zero, compare_double, RegionIdentifier, ServiceIdentifier};

use super::inference::{infer_demand, region_capacity, validate_summary};
use super::{CapacitySettings, DcopAlgorithm, Inbox, RoundOutput};
use crate::catalog::ApplicationCatalog;
use crate::error::{DcopError, Result};
use crate::plan::{RegionPlan, ServicePlan};
use crate::shared::{DcopSharedInformation, ReceiverMessage, NO_ITERATION};
use crate::summary::ResourceSummary;
use crate::LoadTable;

/// Bookkeeping of the last completed round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundReport {
    pub round: i32,
    pub region_capacity: f64,
    /// service → client → inferred demand
    pub demand: LoadTable,
    /// service → client → load served locally
    pub keep_load: LoadTable,
    /// service → client → load that did not fit
    pub excess: LoadTable,
    /// client → service → load served locally
    pub client_keep_load: BTreeMap<RegionIdentifier, BTreeMap<ServiceIdentifier, f64>>,
}

impl RoundReport {
    pub fn kept_total(&self) -> f64 {
        self.keep_load.values().flat_map(|clients| clients.values()).sum()
    }

    pub fn excess_total(&self) -> f64 {
        self.excess.values().flat_map(|clients| clients.values()).sum()
    }

    pub fn demand_total(&self) -> f64 {
        self.demand.values().flat_map(|clients| clients.values()).sum()
    }
}

pub struct BaselineAlgorithm {
    region: RegionIdentifier,
    catalog: Arc<ApplicationCatalog>,
    settings: CapacitySettings,
    last_report: Option<RoundReport>,
}

impl BaselineAlgorithm {
    pub fn new(region: RegionIdentifier, catalog: Arc<ApplicationCatalog>, settings: CapacitySettings) -> Self {
        Self {
            region,
            catalog,
            settings,
            last_report: None,
        }
    }

    pub fn region(&self) -> &RegionIdentifier {
        &self.region
    }

    pub fn last_report(&self) -> Option<&RoundReport> {
        self.last_report.as_ref()
    }

    /// Services in the order they get capacity: priority descending, then
    /// service name.
    fn service_order<'a>(&self, demand: &'a LoadTable) -> Vec<&'a ServiceIdentifier> {
        let mut services: Vec<_> = demand.keys().collect();
        services.sort_by_key(|service| std::cmp::Reverse(self.catalog.priority(service)));
        services
    }

    /// Amounts within tolerance of zero are dropped from both tables; a load
    /// within tolerance of the remaining capacity is kept whole.
    fn allocate(&self, capacity: f64, demand: &LoadTable) -> (LoadTable, LoadTable) {
        let mut keep = LoadTable::new();
        let mut excess = LoadTable::new();
        let mut kept_so_far = 0.0;

        for service in self.service_order(demand) {
            for (client, &load) in &demand[service] {
                let available = capacity - kept_so_far;
                let kept = if compare_double(available, load).is_ge() {
                    load
                } else if compare_double(available, 0.0).is_le() {
                    0.0
                } else {
                    available
                };
                kept_so_far += kept;

                if compare_double(kept, 0.0).is_gt() {
                    keep.entry(service.clone()).or_default().insert(client.clone(), kept);
                }
                let left = load - kept;
                if compare_double(left, 0.0).is_gt() {
                    excess.entry(service.clone()).or_default().insert(client.clone(), left);
                }
            }
        }
        (keep, excess)
    }

    fn plan_from_keep(&self, demand: &LoadTable, keep: &LoadTable) -> RegionPlan {
        let mut plan = RegionPlan::default_plan(self.region.clone(), &self.catalog);

        for (service, clients) in demand {
            let total: f64 = clients.values().sum();
            if approx_zero(total) {
                continue;
            }
            let kept: f64 = keep.get(service).map_or(0.0, |clients| clients.values().sum());
            let local = (kept / total).clamp(0.0, 1.0);

            let fractions = match self.catalog.default_region(service) {
                Some(target) if target != &self.region && !approx_zero(1.0 - local) => {
                    if approx_zero(local) {
                        ServicePlan::from([(target.clone(), 1.0)])
                    } else {
                        ServicePlan::from([(self.region.clone(), local), (target.clone(), 1.0 - local)])
                    }
                }
                _ => ServicePlan::from([(self.region.clone(), 1.0)]),
            };
            plan.services.insert(service.clone(), fractions);
        }
        plan
    }
}

fn by_client(keep: &LoadTable) -> BTreeMap<RegionIdentifier, BTreeMap<ServiceIdentifier, f64>> {
    let mut table: BTreeMap<RegionIdentifier, BTreeMap<ServiceIdentifier, f64>> = BTreeMap::new();
    for (service, clients) in keep {
        for (client, load) in clients {
            *table
                .entry(client.clone())
                .or_default()
                .entry(service.clone())
                .or_insert(0.0) += load;
        }
    }
    table
}

impl DcopAlgorithm for BaselineAlgorithm {
    fn name(&self) -> &'static str {
        "baseline"
    }

    #[instrument(skip_all, fields(region = %self.region))]
    fn compute_plan(&mut self, summary: &ResourceSummary, inbox: &Inbox) -> Result<RoundOutput> {
        if summary.region != self.region {
            return Err(DcopError::SummaryRegionMismatch {
                expected: self.region.clone(),
                actual: summary.region.clone(),
            });
        }
        validate_summary(summary)?;

        let round = inbox
            .get(&self.region)
            .map_or(NO_ITERATION, DcopSharedInformation::iteration)
            + 1;

        let capacity = region_capacity(summary, &self.settings);
        let demand = infer_demand(&self.region, summary, &self.catalog);
        let (keep_load, excess) = self.allocate(capacity, &demand);
        let plan = self.plan_from_keep(&demand, &keep_load);

        let report = RoundReport {
            round,
            region_capacity: capacity,
            client_keep_load: by_client(&keep_load),
            demand,
            keep_load,
            excess,
        };

        if report.excess.is_empty() {
            debug!(round, capacity, demand = report.demand_total(), "demand fits");
        } else {
            warn!(
                round,
                capacity,
                kept = report.kept_total(),
                excess = report.excess_total(),
                "region overloaded"
            );
        }
        self.last_report = Some(report);

        Ok(RoundOutput {
            plan,
            outbox: DcopSharedInformation::new(ReceiverMessage::new(self.region.clone(), round)),
        })
    }
}
