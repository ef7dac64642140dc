//! Immutable topology graph backed by petgraph

use super::error::{Result, TopologyError};
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use types::Link;

/// Weight given to links built without an explicit weight
pub const DEFAULT_LINK_WEIGHT: f64 = 1.0;

/// Undirected multigraph over vertices of type `V`.
///
/// Queries about unknown vertices return empty results rather than errors:
/// the topology is refreshed out of band and a region may legitimately
/// disappear between two rounds.
#[derive(Debug, Clone)]
pub struct Topology<V> {
    graph: UnGraph<V, f64>,
    index: HashMap<V, NodeIndex>,
}

impl<V> Default for Topology<V> {
    fn default() -> Self {
        Self {
            graph: UnGraph::default(),
            index: HashMap::new(),
        }
    }
}

impl<V> Topology<V>
where
    V: Clone + Eq + Hash + Ord + Display + Debug,
{
    pub fn builder() -> TopologyBuilder<V> {
        TopologyBuilder::default()
    }

    /// Build from a vertex collection and unweighted links
    pub fn from_links(
        vertices: impl IntoIterator<Item = V>,
        links: impl IntoIterator<Item = Link<V>>,
    ) -> Result<Self> {
        let mut builder = Self::builder();
        for vertex in vertices {
            builder = builder.vertex(vertex);
        }
        for link in links {
            builder = builder.link(link)?;
        }
        Ok(builder.build())
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, vertex: &V) -> bool {
        self.index.contains_key(vertex)
    }

    /// Every vertex, in ascending order
    pub fn all_vertices(&self) -> BTreeSet<V> {
        self.index.keys().cloned().collect()
    }

    /// Every link, one entry per edge
    pub fn links(&self) -> Vec<Link<V>> {
        self.graph
            .edge_references()
            .map(|edge| self.link_between(edge.source(), edge.target()))
            .collect()
    }

    /// Vertices sharing a link with `vertex`. Empty if `vertex` is unknown.
    pub fn neighbors(&self, vertex: &V) -> BTreeSet<V> {
        match self.index.get(vertex) {
            Some(&idx) => self
                .graph
                .neighbors(idx)
                .map(|n| self.graph[n].clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Minimum-weight path from `source` to `target` as a list of links.
    ///
    /// Empty when either endpoint is unknown, when they are not connected, or
    /// when `source == target`.
    pub fn shortest_path(&self, source: &V, target: &V) -> Vec<Link<V>> {
        let (Some(&from), Some(&to)) = (self.index.get(source), self.index.get(target)) else {
            return Vec::new();
        };

        // a zero heuristic turns A* into Dijkstra with early exit at the target
        let found = astar(&self.graph, from, |n| n == to, |e| *e.weight(), |_| 0.0);
        match found {
            Some((_, nodes)) => nodes
                .windows(2)
                .map(|pair| self.link_between(pair[0], pair[1]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of links on the shortest path, `None` if unreachable
    pub fn hop_count(&self, source: &V, target: &V) -> Option<usize> {
        if !self.contains(source) || !self.contains(target) {
            return None;
        }
        if source == target {
            return Some(0);
        }
        match self.shortest_path(source, target).len() {
            0 => None,
            hops => Some(hops),
        }
    }

    fn link_between(&self, a: NodeIndex, b: NodeIndex) -> Link<V> {
        Link::new(self.graph[a].clone(), self.graph[b].clone())
    }
}

/// Accumulates vertices and links, then produces an immutable [`Topology`].
///
/// The graph is a multigraph: a link added twice becomes two parallel edges
/// and path search takes the cheaper one. Endpoints of a link are added as
/// vertices automatically.
#[derive(Debug)]
pub struct TopologyBuilder<V> {
    vertices: BTreeSet<V>,
    links: Vec<(Link<V>, f64)>,
}

impl<V> Default for TopologyBuilder<V> {
    fn default() -> Self {
        Self {
            vertices: BTreeSet::new(),
            links: Vec::new(),
        }
    }
}

impl<V> TopologyBuilder<V>
where
    V: Clone + Eq + Hash + Ord + Display + Debug,
{
    pub fn vertex(mut self, vertex: V) -> Self {
        self.vertices.insert(vertex);
        self
    }

    pub fn link(self, link: Link<V>) -> Result<Self> {
        self.weighted_link(link, DEFAULT_LINK_WEIGHT)
    }

    pub fn weighted_link(mut self, link: Link<V>, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(TopologyError::InvalidWeight {
                link: link.to_string(),
                weight,
            });
        }
        if link.left() == link.right() {
            return Err(TopologyError::SelfLink {
                link: link.to_string(),
            });
        }
        self.vertices.insert(link.left().clone());
        self.vertices.insert(link.right().clone());
        self.links.push((link, weight));
        Ok(self)
    }

    pub fn build(self) -> Topology<V> {
        let mut graph = UnGraph::with_capacity(self.vertices.len(), self.links.len());
        let mut index = HashMap::with_capacity(self.vertices.len());
        for vertex in self.vertices {
            let idx = graph.add_node(vertex.clone());
            index.insert(vertex, idx);
        }
        for (link, weight) in self.links {
            // both endpoints were inserted into `vertices` when the link was added
            if let (Some(&a), Some(&b)) = (index.get(link.left()), index.get(link.right())) {
                graph.add_edge(a, b, weight);
            }
        }
        Topology { graph, index }
    }
}
