//! Capacity and demand inference from a resource summary

use std::collections::BTreeMap;

use tracing::trace;
use types::{approx_zero, RegionIdentifier, ServiceIdentifier};

use super::CapacitySettings;
use crate::catalog::ApplicationCatalog;
use crate::error::{DcopError, Result};
use crate::summary::{LinkAttribute, ResourceSummary, COMPUTE_ATTRIBUTE};
use crate::LoadTable;

/// Capacity the algorithm may allocate this round.
///
/// Every service beyond the first reserves `min_service_capacity`, the
/// remainder is scaled by `capacity_threshold`. Never negative.
pub fn region_capacity(summary: &ResourceSummary, settings: &CapacitySettings) -> f64 {
    let capacity = summary.capacity(COMPUTE_ATTRIBUTE);
    let reserved = summary.server_demand.len().saturating_sub(1) as f64 * settings.min_service_capacity;
    ((capacity - reserved) * settings.capacity_threshold).max(0.0)
}

/// Compute load per planned service, summed over originating regions
pub fn aggregate_compute(summary: &ResourceSummary, catalog: &ApplicationCatalog) -> BTreeMap<ServiceIdentifier, f64> {
    summary
        .server_demand
        .iter()
        .filter(|(service, _)| catalog.is_planned(service))
        .map(|(service, per_source)| {
            let load = per_source
                .values()
                .filter_map(|attributes| attributes.get(&COMPUTE_ATTRIBUTE))
                .sum::<f64>();
            (service.clone(), load)
        })
        .collect()
}

/// Traffic of flows served locally: service → client region → volume
pub fn network_per_client(region: &RegionIdentifier, summary: &ResourceSummary, catalog: &ApplicationCatalog) -> LoadTable {
    let mut traffic = LoadTable::new();

    for flows in summary.network_demand.values() {
        for demand in flows {
            let flow = &demand.flow;
            if flow.source != flow.server || &flow.server != region {
                continue;
            }
            let Some(client) = flow.client() else {
                continue;
            };
            for (service, attributes) in &demand.services {
                if !catalog.is_planned(service) {
                    continue;
                }
                let volume: f64 = LinkAttribute::TRAFFIC
                    .iter()
                    .filter_map(|attribute| attributes.get(attribute))
                    .sum();
                *traffic
                    .entry(service.clone())
                    .or_default()
                    .entry(client.clone())
                    .or_insert(0.0) += volume;
            }
        }
    }
    traffic
}

/// Splits each service's compute load across client regions in proportion
/// to the traffic each client sends.
///
/// Only services with served traffic get entries; compute that no flow
/// explains is not attributed to any client. When all of a service's traffic
/// is zero every client gets a zero share.
pub fn infer_demand(region: &RegionIdentifier, summary: &ResourceSummary, catalog: &ApplicationCatalog) -> LoadTable {
    let compute = aggregate_compute(summary, catalog);
    let traffic = network_per_client(region, summary, catalog);

    let mut demand = LoadTable::new();
    for (service, per_client) in traffic {
        let Some(&load) = compute.get(&service) else {
            trace!(%service, "traffic without compute, skipping");
            continue;
        };
        let total: f64 = per_client.values().sum();

        let shares = per_client
            .into_iter()
            .map(|(client, volume)| {
                let share = if approx_zero(total) { 0.0 } else { volume / total };
                (client, load * share)
            })
            .collect();
        demand.insert(service, shares);
    }

    let unexplained = compute.keys().filter(|service| !demand.contains_key(*service)).count();
    if unexplained > 0 {
        trace!(unexplained, "compute without served traffic left unattributed");
    }
    demand
}

/// Rejects negative or non-finite capacity and demand values
pub fn validate_summary(summary: &ResourceSummary) -> Result<()> {
    for (attribute, value) in &summary.server_capacity {
        check(*value, || format!("capacity {attribute:?}"))?;
    }
    for (service, per_source) in &summary.server_demand {
        for (source, attributes) in per_source {
            for (attribute, value) in attributes {
                check(*value, || format!("demand {service}/{source}/{attribute:?}"))?;
            }
        }
    }
    for flows in summary.network_demand.values() {
        for demand in flows {
            for (service, attributes) in &demand.services {
                for (attribute, value) in attributes {
                    check(*value, || format!("traffic {service}/{attribute:?}"))?;
                }
            }
        }
    }
    Ok(())
}

fn check(value: f64, what: impl FnOnce() -> String) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DcopError::invalid_value(what(), value))
    }
}
