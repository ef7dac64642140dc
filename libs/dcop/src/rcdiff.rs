//! RCdiff load maps and messages
//!
//! The tree-based variant grows one tree per overloaded root region. Every
//! message carries load maps keyed by the tree they belong to
//! ([`AugmentedRoot`]) and how far from the root the sender sits.
//!
//! Load values are floating point and travel through serialization, so two
//! load maps compare equal when they agree within
//! [`DOUBLE_TOLERANCE`](types::DOUBLE_TOLERANCE). Hashing only looks at the
//! tree identity and hop count, which keeps `Hash` consistent with that
//! looser equality.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use types::{approx_eq, RegionIdentifier, ServiceIdentifier};

/// Root of a DCOP tree plus a counter distinguishing successive trees
/// grown from the same root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AugmentedRoot {
    pub root: Option<RegionIdentifier>,
    pub tree_number: i32,
}

impl AugmentedRoot {
    pub const EMPTY: AugmentedRoot = AugmentedRoot {
        root: None,
        tree_number: 0,
    };

    pub fn new(root: RegionIdentifier, tree_number: i32) -> Self {
        Self {
            root: Some(root),
            tree_number,
        }
    }

    pub fn is_empty_tree(&self) -> bool {
        self.root.is_none()
    }

    pub fn has_region(&self, region: &RegionIdentifier) -> bool {
        self.root.as_ref() == Some(region)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerClientService {
    pub server: RegionIdentifier,
    pub client: RegionIdentifier,
    pub service: ServiceIdentifier,
}

impl ServerClientService {
    pub fn new(server: RegionIdentifier, client: RegionIdentifier, service: ServiceIdentifier) -> Self {
        Self { server, client, service }
    }
}

/// Key of the outer load map
///
/// Most messages key load by service. Some protocol steps key it by a
/// numeric slot instead (for example the hop count of a proposal).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoadKey {
    Service(ServiceIdentifier),
    Slot(i32),
}

impl From<ServiceIdentifier> for LoadKey {
    fn from(service: ServiceIdentifier) -> Self {
        LoadKey::Service(service)
    }
}

impl From<i32> for LoadKey {
    fn from(slot: i32) -> Self {
        LoadKey::Slot(slot)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RcDiffLoadMap {
    pub augmented_root: AugmentedRoot,
    pub hop: i32,
    /// key → region → load
    pub load_map: BTreeMap<LoadKey, BTreeMap<RegionIdentifier, f64>>,
    pub server_client_service: BTreeMap<ServerClientService, f64>,
}

impl RcDiffLoadMap {
    pub fn new(augmented_root: AugmentedRoot, hop: i32) -> Self {
        Self {
            augmented_root,
            hop,
            ..Self::default()
        }
    }

    pub fn add_load(&mut self, key: impl Into<LoadKey>, region: RegionIdentifier, load: f64) {
        *self
            .load_map
            .entry(key.into())
            .or_default()
            .entry(region)
            .or_insert(0.0) += load;
    }

    pub fn add_server_client_load(&mut self, key: ServerClientService, load: f64) {
        *self.server_client_service.entry(key).or_insert(0.0) += load;
    }

    /// Sum of every load in the outer map
    pub fn total_load(&self) -> f64 {
        self.load_map.values().flat_map(|inner| inner.values()).sum()
    }
}

impl PartialEq for RcDiffLoadMap {
    fn eq(&self, other: &Self) -> bool {
        self.augmented_root == other.augmented_root
            && self.hop == other.hop
            && maps_approx_eq(&self.load_map, &other.load_map, |a, b| maps_approx_eq(a, b, f64_eq))
            && maps_approx_eq(&self.server_client_service, &other.server_client_service, f64_eq)
    }
}

impl Eq for RcDiffLoadMap {}

impl Hash for RcDiffLoadMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.augmented_root.hash(state);
        self.hop.hash(state);
    }
}

fn f64_eq(a: &f64, b: &f64) -> bool {
    approx_eq(*a, *b)
}

fn maps_approx_eq<K: Ord, V>(a: &BTreeMap<K, V>, b: &BTreeMap<K, V>, eq: impl Fn(&V, &V) -> bool) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && eq(va, vb))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RcDiffMessageType {
    ServerToClient,
    Ask,
    Done,
    Propose,
    Plan,
}

/// Load maps grouped by protocol message type
///
/// Each group behaves as a set: inserting a load map equal to one already
/// present is a no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RcDiffMessage {
    messages: BTreeMap<RcDiffMessageType, Vec<RcDiffLoadMap>>,
}

impl RcDiffMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(message_type: RcDiffMessageType, load_map: RcDiffLoadMap) -> Self {
        let mut message = Self::new();
        message.insert(message_type, load_map);
        message
    }

    /// Returns false when an equal load map was already present
    pub fn insert(&mut self, message_type: RcDiffMessageType, load_map: RcDiffLoadMap) -> bool {
        let group = self.messages.entry(message_type).or_default();
        if group.contains(&load_map) {
            return false;
        }
        group.push(load_map);
        true
    }

    pub fn get(&self, message_type: RcDiffMessageType) -> &[RcDiffLoadMap] {
        self.messages.get(&message_type).map_or(&[], Vec::as_slice)
    }

    pub fn contains_type(&self, message_type: RcDiffMessageType) -> bool {
        self.messages.get(&message_type).is_some_and(|group| !group.is_empty())
    }

    pub fn message_types(&self) -> impl Iterator<Item = RcDiffMessageType> + '_ {
        self.messages
            .iter()
            .filter(|(_, group)| !group.is_empty())
            .map(|(message_type, _)| *message_type)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.values().all(Vec::is_empty)
    }
}

impl PartialEq for RcDiffMessage {
    fn eq(&self, other: &Self) -> bool {
        let types: Vec<_> = self.message_types().collect();
        if types != other.message_types().collect::<Vec<_>>() {
            return false;
        }
        types.into_iter().all(|message_type| {
            let ours = self.get(message_type);
            let theirs = other.get(message_type);
            ours.len() == theirs.len() && ours.iter().all(|load_map| theirs.contains(load_map))
        })
    }
}
