//! Shared test utilities for graph and cache testing

use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    cache::{KeyValueCache, KeyValueStore, MemoryCache, MemoryKeyValueStore, ReachabilityCache},
    error::HierarchyError,
    graph::DynamicGraph,
    vertex::{Edge, Vertex},
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn vertex(id: &str) -> Vertex {
    Vertex::new(id).unwrap()
}

pub fn edge(start: &str, end: &str) -> Edge {
    Edge::new(vertex(start), vertex(end))
}

/// One of each cache variant, labeled for assertion messages.
pub fn cache_variants() -> Vec<(&'static str, Arc<dyn ReachabilityCache>)> {
    vec![
        ("memory", Arc::new(MemoryCache::new()) as Arc<dyn ReachabilityCache>),
        (
            "key-value",
            Arc::new(KeyValueCache::new(
                Arc::new(MemoryKeyValueStore::default()),
                "e",
            )),
        ),
    ]
}

/// Build a graph over `cache` holding `edges`, given as `(parent, child)` pairs.
pub fn graph_with_edges(cache: Arc<dyn ReachabilityCache>, edges: &[(&str, &str)]) -> DynamicGraph {
    init_logging();
    let graph = DynamicGraph::new(cache);
    for (start, end) in edges {
        graph.add_edge(&edge(start, end)).unwrap();
    }
    graph
}

/// A [`KeyValueStore`] over [`MemoryKeyValueStore`] that fails a configurable number of upcoming
/// calls and records every operation it receives.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryKeyValueStore,
    pub failing_gets: AtomicUsize,
    pub failing_sets: AtomicUsize,
    pub failing_deletes: AtomicUsize,
    pub failing_scans: AtomicUsize,
    pub log: Mutex<Vec<String>>,
}

impl FlakyStore {
    fn should_fail(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn record(&self, op: &str, key: &str) {
        self.log.lock().push(format!("{op} {key}"));
    }

    pub fn ops(&self, op: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|entry| entry.starts_with(&format!("{op} ")))
            .count()
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, HierarchyError> {
        self.record("get", key);
        if Self::should_fail(&self.failing_gets) {
            return Err(HierarchyError::Cache(format!("injected get failure for {key}")));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HierarchyError> {
        self.record("set", key);
        if Self::should_fail(&self.failing_sets) {
            return Err(HierarchyError::Cache(format!("injected set failure for {key}")));
        }
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), HierarchyError> {
        self.record("delete", key);
        if Self::should_fail(&self.failing_deletes) {
            return Err(HierarchyError::Cache(format!(
                "injected delete failure for {key}"
            )));
        }
        self.inner.delete(key)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<String>, HierarchyError> {
        self.record("scan", prefix);
        if Self::should_fail(&self.failing_scans) {
            return Err(HierarchyError::Cache(format!(
                "injected scan failure for {prefix}"
            )));
        }
        self.inner.scan(prefix)
    }
}
