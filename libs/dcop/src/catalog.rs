//! Application catalog
//!
//! Static knowledge about each service: how important it is when capacity
//! runs short, where its traffic goes by default, and whether the planner
//! should emit an entry for it at all.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use types::{RegionIdentifier, ServiceIdentifier};

/// Priority of services missing from the catalog
pub const DEFAULT_PRIORITY: i32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub service: ServiceIdentifier,
    /// Higher keeps its load first
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub default_region: Option<RegionIdentifier>,
    /// Whether plans carry an entry for this service
    #[serde(default = "default_planned")]
    pub planned: bool,
}

fn default_planned() -> bool {
    true
}

impl ApplicationSpec {
    pub fn new(service: impl Into<ServiceIdentifier>, priority: i32) -> Self {
        Self {
            service: service.into(),
            priority,
            default_region: None,
            planned: true,
        }
    }

    pub fn with_default_region(mut self, region: impl Into<RegionIdentifier>) -> Self {
        self.default_region = Some(region.into());
        self
    }

    pub fn unplanned(mut self) -> Self {
        self.planned = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCatalog {
    specs: BTreeMap<ServiceIdentifier, ApplicationSpec>,
}

impl ApplicationCatalog {
    pub fn new(specs: impl IntoIterator<Item = ApplicationSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|spec| (spec.service.clone(), spec)).collect(),
        }
    }

    pub fn insert(&mut self, spec: ApplicationSpec) {
        self.specs.insert(spec.service.clone(), spec);
    }

    pub fn get(&self, service: &ServiceIdentifier) -> Option<&ApplicationSpec> {
        self.specs.get(service)
    }

    pub fn priority(&self, service: &ServiceIdentifier) -> i32 {
        self.specs.get(service).map_or(DEFAULT_PRIORITY, |spec| spec.priority)
    }

    pub fn default_region(&self, service: &ServiceIdentifier) -> Option<&RegionIdentifier> {
        self.specs.get(service).and_then(|spec| spec.default_region.as_ref())
    }

    /// Services outside the catalog are planned.
    pub fn is_planned(&self, service: &ServiceIdentifier) -> bool {
        self.specs.get(service).map_or(true, |spec| spec.planned)
    }

    pub fn planned_services(&self) -> impl Iterator<Item = &ApplicationSpec> {
        self.specs.values().filter(|spec| spec.planned)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_fall_back_for_unknown_services() {
        let catalog = ApplicationCatalog::new([
            ApplicationSpec::new("web", 5).with_default_region("A"),
            ApplicationSpec::new("batch", 1).unplanned(),
        ]);

        assert_eq!(catalog.priority(&"web".into()), 5);
        assert_eq!(catalog.priority(&"other".into()), DEFAULT_PRIORITY);
        assert_eq!(catalog.default_region(&"web".into()), Some(&RegionIdentifier::new("A")));
        assert_eq!(catalog.default_region(&"batch".into()), None);
        assert!(catalog.is_planned(&"other".into()));
        assert!(!catalog.is_planned(&"batch".into()));

        let planned: Vec<_> = catalog.planned_services().map(|s| s.service.as_str()).collect();
        assert_eq!(planned, vec!["web"]);
    }

    #[test]
    fn test_planned_defaults_to_true_when_deserialized() {
        let spec: ApplicationSpec = serde_json::from_str(r#"{"service":"web","priority":2}"#).unwrap();
        assert!(spec.planned);
        assert_eq!(spec.default_region, None);
    }
}
