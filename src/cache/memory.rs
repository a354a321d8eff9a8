use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::ReachabilityCache;
use crate::{
    error::HierarchyError,
    vertex::{Edge, Vertex},
};

/// Process-local reachability cache. Entries are grouped by start vertex so that prefix
/// invalidation drops one group instead of scanning every key.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<BTreeMap<Vertex, BTreeMap<Vertex, bool>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        tracing::info!("Created an instance of in-memory reachability cache");
        MemoryCache::default()
    }
}

impl ReachabilityCache for MemoryCache {
    fn get(&self, edge: &Edge) -> Result<Option<bool>, HierarchyError> {
        Ok(self
            .entries
            .read()
            .get(&edge.start)
            .and_then(|ends| ends.get(&edge.end))
            .copied())
    }

    fn set(&self, edge: &Edge, value: bool) -> Result<(), HierarchyError> {
        self.entries
            .write()
            .entry(edge.start.clone())
            .or_default()
            .insert(edge.end.clone(), value);
        Ok(())
    }

    fn delete(&self, edge: &Edge) {
        let mut entries = self.entries.write();
        if let Some(ends) = entries.get_mut(&edge.start) {
            ends.remove(&edge.end);
            if ends.is_empty() {
                entries.remove(&edge.start);
            }
        }
    }

    fn clear(&self) -> Result<(), HierarchyError> {
        self.entries.write().clear();
        Ok(())
    }

    fn size(&self) -> Result<usize, HierarchyError> {
        Ok(self.entries.read().values().map(BTreeMap::len).sum())
    }

    fn delete_by_prefix(&self, start: &Vertex) -> Result<(), HierarchyError> {
        self.entries.write().remove(start);
        Ok(())
    }
}
