//! Shared handle to the current topology snapshot

use super::graph::Topology;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Holds the latest topology and hands out immutable snapshots.
///
/// Readers clone an `Arc` and keep using it for as long as they like; a
/// concurrent [`replace`](Self::replace) only affects later snapshots.
#[derive(Debug)]
pub struct TopologyService<V> {
    current: RwLock<Arc<Topology<V>>>,
}

impl<V> TopologyService<V> {
    pub fn new(initial: Topology<V>) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn snapshot(&self) -> Arc<Topology<V>> {
        Arc::clone(&self.current.read())
    }

    /// Install a fully built topology
    pub fn replace(&self, topology: Topology<V>)
    where
        V: Clone + Eq + std::hash::Hash + Ord + std::fmt::Display + std::fmt::Debug,
    {
        let vertices = topology.vertex_count();
        let links = topology.link_count();
        *self.current.write() = Arc::new(topology);
        info!(vertices, links, "topology replaced");
    }
}

impl<V> Default for TopologyService<V> {
    fn default() -> Self {
        Self::new(Topology::default())
    }
}
