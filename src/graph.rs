//! The dynamic hierarchy graph and its cached reachability query.
//!
//! [`DynamicGraph`] owns a directed petgraph [`Graph`] of [`Vertex`] nodes behind a single
//! readers-writer lock, plus a shared [`ReachabilityCache`]. The cache is an optimization only:
//! every successful edge mutation purges, while the write lock is still held, the cache entries
//! that start at the edited parent or at any of its ancestors. Those are exactly the start
//! vertices whose paths can run through the edited edge.
//!
//! Lock discipline:
//! - `add_edge`, `remove_edge` and the cache-miss path of `has_path` take the exclusive lock.
//!   Serializing misses means two callers never compute and store the same answer concurrently,
//!   and a search never observes a half-applied edit.
//! - `get_all_nested_children`, `get_parents`, `size` and the [`fmt::Display`] dump take the
//!   shared lock.
//! - The cache-hit path of `has_path` takes no graph lock at all. A hit racing with an
//!   invalidation may return the answer that is being purged.

use parking_lot::RwLock;
use petgraph::{
    graph::{Graph, NodeIndex},
    visit::{Bfs, Reversed},
    Direction,
};
use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    cache::ReachabilityCache,
    error::HierarchyError,
    vertex::{Edge, Vertex},
};


/// Adjacency structure: the petgraph graph plus a vertex index into it. Nodes are never removed,
/// so a [`NodeIndex`] stays valid once assigned.
#[derive(Debug, Default)]
struct Adjacency {
    graph: Graph<Vertex, ()>,
    index: BTreeMap<Vertex, NodeIndex>,
}

impl Adjacency {
    fn node(&self, vertex: &Vertex) -> Option<NodeIndex> {
        self.index.get(vertex).copied()
    }

    fn node_or_insert(&mut self, vertex: &Vertex) -> NodeIndex {
        if let Some(idx) = self.node(vertex) {
            return idx;
        }
        let idx = self.graph.add_node(vertex.clone());
        self.index.insert(vertex.clone(), idx);
        idx
    }

    /// Breadth-first search from `start`. Returns whether `end` was dequeued and how many vertices
    /// were visited. A vertex always reaches itself, even one the graph has never seen.
    fn search(&self, start: &Vertex, end: &Vertex) -> (bool, usize) {
        let Some(origin) = self.node(start) else {
            return (start == end, 1);
        };
        let mut bfs = Bfs::new(&self.graph, origin);
        let mut visited = 0;
        while let Some(nx) = bfs.next(&self.graph) {
            visited += 1;
            if self.graph[nx] == *end {
                return (true, visited);
            }
        }
        (false, visited)
    }

    /// `idx` and every vertex that reaches it.
    fn ancestors(&self, idx: NodeIndex) -> Vec<Vertex> {
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, idx);
        let mut ancestors = Vec::new();
        while let Some(nx) = bfs.next(reversed) {
            ancestors.push(self.graph[nx].clone());
        }
        ancestors
    }

    fn children(&self, idx: NodeIndex) -> Vec<&Vertex> {
        let mut children = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|nx| &self.graph[nx])
            .collect::<Vec<_>>();
        children.sort();
        children
    }
}

pub struct DynamicGraph {
    adjacency: RwLock<Adjacency>,
    cache: Arc<dyn ReachabilityCache>,
    max_cache_entries: Option<usize>,
}

impl fmt::Debug for DynamicGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicGraph")
            .field("edges", &self.size())
            .field("max_cache_entries", &self.max_cache_entries)
            .finish_non_exhaustive()
    }
}

impl DynamicGraph {
    pub fn new(cache: Arc<dyn ReachabilityCache>) -> Self {
        DynamicGraph {
            adjacency: RwLock::new(Adjacency::default()),
            cache,
            max_cache_entries: None,
        }
    }

    /// After each cache write made by [`DynamicGraph::has_path`], clear the cache once it holds
    /// more than `max` entries.
    pub fn with_max_cache_entries(mut self, max: Option<usize>) -> Self {
        self.max_cache_entries = max;
        self
    }

    /// Insert `edge.start -> edge.end`. Adding an existing edge, or [`Edge::NIL`], is a no-op that
    /// leaves the cache untouched.
    ///
    /// The graph edit itself cannot fail; an error means the edit was applied but the cache
    /// entries it invalidated could not all be purged.
    pub fn add_edge(&self, edge: &Edge) -> Result<(), HierarchyError> {
        if edge.is_nil() {
            return Ok(());
        }
        let mut adjacency = self.adjacency.write();
        let parent = adjacency.node_or_insert(&edge.start);
        let child = adjacency.node_or_insert(&edge.end);
        if adjacency.graph.find_edge(parent, child).is_some() {
            tracing::debug!("Edge {} already present, nothing to add", edge);
            return Ok(());
        }
        adjacency.graph.add_edge(parent, child, ());
        let invalidated = self.invalidate_paths_through(&adjacency, parent)?;
        tracing::debug!(
            "Added edge {} and invalidated paths from {} vertices",
            edge,
            invalidated
        );
        Ok(())
    }

    /// Remove `edge.start -> edge.end`. Removing a missing edge, or [`Edge::NIL`], is a no-op.
    pub fn remove_edge(&self, edge: &Edge) -> Result<(), HierarchyError> {
        if edge.is_nil() {
            return Ok(());
        }
        let mut adjacency = self.adjacency.write();
        let found = match (adjacency.node(&edge.start), adjacency.node(&edge.end)) {
            (Some(parent), Some(child)) => adjacency
                .graph
                .find_edge(parent, child)
                .map(|existing| (parent, existing)),
            _ => None,
        };
        let Some((parent, existing)) = found else {
            tracing::debug!("Edge {} not present, nothing to remove", edge);
            return Ok(());
        };
        adjacency.graph.remove_edge(existing);
        let invalidated = self.invalidate_paths_through(&adjacency, parent)?;
        tracing::debug!(
            "Removed edge {} and invalidated paths from {} vertices",
            edge,
            invalidated
        );
        Ok(())
    }

    /// Purge cached answers starting at `parent` or at any vertex that reaches it. Must be called
    /// with the write lock held, after the edit.
    fn invalidate_paths_through(
        &self,
        adjacency: &Adjacency,
        parent: NodeIndex,
    ) -> Result<usize, HierarchyError> {
        let ancestors = adjacency.ancestors(parent);
        let mut first_error = None;
        for ancestor in ancestors.iter() {
            if let Err(e) = self.cache.delete_by_prefix(ancestor) {
                tracing::warn!("Could not purge cached paths from {}: {}", ancestor, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            None => Ok(ancestors.len()),
            Some(e) => {
                // a stale entry may survive the failed purge; drop everything instead
                if let Err(clear_error) = self.cache.clear() {
                    tracing::error!(
                        "Could not clear reachability cache after failed purge: {}",
                        clear_error
                    );
                }
                Err(e)
            }
        }
    }

    /// Whether `end` is reachable from `start` (every vertex reaches itself).
    ///
    /// Compute-once-under-lock: a cache hit returns without touching the graph lock. On a miss the
    /// exclusive lock is taken and the cache re-checked, since another caller may have stored the
    /// answer while this one waited. Only then is the breadth-first search run and its answer
    /// cached, true or false.
    pub fn has_path(&self, start: &Vertex, end: &Vertex) -> Result<bool, HierarchyError> {
        let query = Edge::new(start.clone(), end.clone());
        if let Some(reachable) = self.cache.get(&query)? {
            return Ok(reachable);
        }

        let adjacency = self.adjacency.write();
        if let Some(reachable) = self.cache.get(&query)? {
            return Ok(reachable);
        }
        let (reachable, visited) = adjacency.search(start, end);
        tracing::debug!(
            "Computed path {} -> {}: {} ({} vertices visited)",
            start,
            end,
            reachable,
            visited
        );
        self.cache.set(&query, reachable)?;
        if let Some(max) = self.max_cache_entries {
            self.limit_cache_size(max)?;
        }
        Ok(reachable)
    }

    /// `vertex` followed by every vertex reachable from it, in breadth-first order. Never cached.
    pub fn get_all_nested_children(&self, vertex: &Vertex) -> Vec<Vertex> {
        let adjacency = self.adjacency.read();
        let Some(origin) = adjacency.node(vertex) else {
            return vec![vertex.clone()];
        };
        let mut bfs = Bfs::new(&adjacency.graph, origin);
        let mut nested = Vec::new();
        while let Some(nx) = bfs.next(&adjacency.graph) {
            nested.push(adjacency.graph[nx].clone());
        }
        nested
    }

    /// Every vertex that lists `vertex` as a direct child, sorted.
    pub fn get_parents(&self, vertex: &Vertex) -> Vec<Vertex> {
        let adjacency = self.adjacency.read();
        let Some(idx) = adjacency.node(vertex) else {
            return Vec::new();
        };
        let mut parents = adjacency
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|nx| adjacency.graph[nx].clone())
            .collect::<Vec<_>>();
        parents.sort();
        parents
    }

    pub fn has_edge(&self, edge: &Edge) -> bool {
        let adjacency = self.adjacency.read();
        match (adjacency.node(&edge.start), adjacency.node(&edge.end)) {
            (Some(parent), Some(child)) => adjacency.graph.contains_edge(parent, child),
            _ => false,
        }
    }

    /// Total number of edges.
    pub fn size(&self) -> usize {
        self.adjacency.read().graph.edge_count()
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.read().graph.node_count()
    }

    pub fn cache_size(&self) -> Result<usize, HierarchyError> {
        self.cache.size()
    }

    pub fn clear_cache(&self) -> Result<(), HierarchyError> {
        self.cache.clear()
    }

    /// Clear the whole cache if it holds more than `max` entries. Returns whether it was cleared.
    pub fn limit_cache_size(&self, max: usize) -> Result<bool, HierarchyError> {
        let size = self.cache.size()?;
        if size <= max {
            return Ok(false);
        }
        self.cache.clear()?;
        tracing::info!(
            "Cleared reachability cache holding {} entries (limit {})",
            size,
            max
        );
        Ok(true)
    }
}

/// One line per vertex with children, `parent -> [child, ...]`, sorted.
impl fmt::Display for DynamicGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let adjacency = self.adjacency.read();
        for (vertex, idx) in adjacency.index.iter() {
            let children = adjacency.children(*idx);
            if children.is_empty() {
                continue;
            }
            let children = children
                .iter()
                .map(|child| child.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "{vertex} -> [{children}]")?;
        }
        Ok(())
    }
}
