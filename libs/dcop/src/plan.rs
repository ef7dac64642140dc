//! Regional plan
//!
//! For each planned service, the fraction of its traffic to send to each
//! region. Fractions of one service add up to 1.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use types::{approx_eq, approx_zero, compare_double, RegionIdentifier, ServiceIdentifier};

use crate::catalog::ApplicationCatalog;

/// region → fraction of traffic
pub type ServicePlan = BTreeMap<RegionIdentifier, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionPlan {
    pub region: RegionIdentifier,
    /// Milliseconds since the Unix epoch when the plan was computed
    pub timestamp_ms: u64,
    pub services: BTreeMap<ServiceIdentifier, ServicePlan>,
}

/// Plans compare on content only, fractions within tolerance.
impl PartialEq for RegionPlan {
    fn eq(&self, other: &Self) -> bool {
        self.region == other.region
            && self.services.len() == other.services.len()
            && self.services.iter().zip(other.services.iter()).all(|((sa, pa), (sb, pb))| {
                sa == sb
                    && pa.len() == pb.len()
                    && pa
                        .iter()
                        .zip(pb.iter())
                        .all(|((ra, fa), (rb, fb))| ra == rb && approx_eq(*fa, *fb))
            })
    }
}

impl RegionPlan {
    pub fn new(region: RegionIdentifier, services: BTreeMap<ServiceIdentifier, ServicePlan>) -> Self {
        Self {
            region,
            timestamp_ms: now_ms(),
            services,
        }
    }

    /// Every planned service sends all traffic to its default region, or to
    /// `region` when it has none.
    pub fn default_plan(region: RegionIdentifier, catalog: &ApplicationCatalog) -> Self {
        let services = catalog
            .planned_services()
            .map(|spec| {
                let target = spec.default_region.clone().unwrap_or_else(|| region.clone());
                (spec.service.clone(), ServicePlan::from([(target, 1.0)]))
            })
            .collect();
        Self::new(region, services)
    }

    /// Builds a plan from signed per-neighbor load.
    ///
    /// `flow_load` maps neighbor → service → load, where positive load comes
    /// in from that neighbor and negative load leaves towards it. For each
    /// service receiving load, the share sent to a neighbor is its outgoing
    /// load over the incoming total and the local region keeps the rest.
    /// Planned services that receive nothing fall back to the default plan.
    pub fn from_flow_load(
        region: RegionIdentifier,
        flow_load: &BTreeMap<RegionIdentifier, BTreeMap<ServiceIdentifier, f64>>,
        catalog: &ApplicationCatalog,
    ) -> Self {
        let mut incoming: BTreeMap<&ServiceIdentifier, f64> = BTreeMap::new();
        let mut outgoing: BTreeMap<&ServiceIdentifier, BTreeMap<&RegionIdentifier, f64>> = BTreeMap::new();

        for (neighbor, per_service) in flow_load {
            for (service, load) in per_service {
                if compare_double(*load, 0.0).is_gt() {
                    *incoming.entry(service).or_insert(0.0) += load;
                } else if compare_double(*load, 0.0).is_lt() {
                    *outgoing.entry(service).or_default().entry(neighbor).or_insert(0.0) -= load;
                }
            }
        }

        let mut plan = Self::default_plan(region.clone(), catalog);
        if approx_zero(incoming.values().sum()) {
            return plan;
        }

        for (service, incoming_load) in incoming {
            let fractions = match outgoing.get(service) {
                None => ServicePlan::from([(region.clone(), 1.0)]),
                Some(targets) => split_incoming(&region, incoming_load, targets),
            };
            plan.services.insert(service.clone(), fractions);
        }
        plan
    }

    pub fn service(&self, service: &ServiceIdentifier) -> Option<&ServicePlan> {
        self.services.get(service)
    }

    /// Whether every service's fractions are non-negative and sum to 1
    pub fn is_normalized(&self) -> bool {
        self.services.values().all(|fractions| {
            fractions.values().all(|f| compare_double(*f, 0.0).is_ge()) && approx_eq(fractions.values().sum(), 1.0)
        })
    }
}

fn split_incoming(
    region: &RegionIdentifier,
    incoming: f64,
    outgoing: &BTreeMap<&RegionIdentifier, f64>,
) -> ServicePlan {
    let mut ratios: Vec<(RegionIdentifier, f64)> = outgoing
        .iter()
        .map(|(neighbor, load)| ((*neighbor).clone(), load / incoming))
        .collect();

    let total: f64 = ratios.iter().map(|(_, ratio)| ratio).sum();
    if compare_double(total, 1.0).is_gt() {
        for (_, ratio) in &mut ratios {
            *ratio /= total;
        }
    }

    let mut fractions = ServicePlan::new();
    let mut nonzero = Vec::new();
    for (neighbor, ratio) in ratios {
        if approx_zero(ratio) {
            fractions.insert(neighbor, 0.0);
        } else {
            nonzero.push((neighbor, ratio));
        }
    }

    let kept = 1.0 - nonzero.iter().map(|(_, ratio)| ratio).sum::<f64>();
    if approx_zero(kept) {
        fractions.insert(region.clone(), 0.0);
    } else {
        nonzero.push((region.clone(), kept));
    }

    // The last entry absorbs rounding so the service sums to exactly 1.
    if let Some((last, _)) = nonzero.pop() {
        let assigned: f64 = nonzero.iter().map(|(_, ratio)| ratio).sum();
        fractions.extend(nonzero);
        fractions.insert(last, 1.0 - assigned);
    }
    fractions
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
