//! Startup bulk load of the persisted hierarchy.
//!
//! An [`EdgeSource`] serves `(node, parent)` pairs in pages. [`EdgeIter`] walks those pages
//! through a small LIFO buffer, and [`load_hierarchy`] feeds every pair to the
//! [`ChangeProcessor`] one at a time. A root pair (no parent) becomes [`Edge::NIL`](crate::vertex::Edge::NIL), which the
//! processor accepts as a no-op.
//!
//! A page that still fails after one retry, or an edge the processor rejects, ends the load with
//! [`HierarchyError::Startup`]: an authorization graph missing part of the hierarchy must not be
//! served.

use parking_lot::RwLock;
use std::{future::Future, sync::Arc, time::Instant};

use crate::{
    config::HierarchyConfig,
    error::HierarchyError,
    graph::DynamicGraph,
    hierarchy::HierarchyTree,
    processor::ChangeProcessor,
    vertex::NodeEdge,
};


/// Paginated access to the persisted `(node, parent)` pairs. Pages come in a stable order; an
/// empty page means there is nothing past `offset`.
pub trait EdgeSource: Sync {
    fn get_edge_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<NodeEdge>, HierarchyError>> + Send;

    /// Number of persisted nodes.
    fn count(&self) -> impl Future<Output = Result<usize, HierarchyError>> + Send;
}

/// An in-memory [`EdgeSource`] serving pairs in insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryEdgeSource {
    pairs: Arc<RwLock<Vec<NodeEdge>>>,
}

impl MemoryEdgeSource {
    pub fn new(pairs: Vec<NodeEdge>) -> Self {
        MemoryEdgeSource {
            pairs: Arc::new(RwLock::new(pairs)),
        }
    }

    pub fn push(&self, pair: NodeEdge) {
        self.pairs.write().push(pair);
    }
}

impl EdgeSource for MemoryEdgeSource {
    async fn get_edge_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<NodeEdge>, HierarchyError> {
        let pairs = self.pairs.read();
        Ok(pairs.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<usize, HierarchyError> {
        Ok(self.pairs.read().len())
    }
}

/// Cursor over every pair of an [`EdgeSource`].
///
/// When the buffer runs dry the next page is fetched, pushed onto the buffer and the offset
/// advanced by `limit`; pairs are then popped one at a time. After the terminal empty page every
/// call returns `Ok(None)` without touching the source again.
pub struct EdgeIter<'a, S: EdgeSource> {
    source: &'a S,
    limit: usize,
    offset: usize,
    buffer: Vec<NodeEdge>,
    exhausted: bool,
}

impl<'a, S: EdgeSource> EdgeIter<'a, S> {
    pub fn new(source: &'a S, limit: usize) -> Self {
        EdgeIter {
            source,
            limit: limit.max(1),
            offset: 0,
            buffer: Vec::new(),
            exhausted: false,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub async fn next(&mut self) -> Result<Option<NodeEdge>, HierarchyError> {
        if let Some(pair) = self.buffer.pop() {
            return Ok(Some(pair));
        }
        if self.exhausted {
            return Ok(None);
        }
        let page = self.fetch_page().await?;
        if page.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        self.offset += self.limit;
        self.buffer.extend(page);
        Ok(self.buffer.pop())
    }

    /// Backend failures are retried once and then become [`HierarchyError::Startup`]. A malformed
    /// row is returned as is, without a retry.
    #[tracing::instrument(skip(self), fields(offset = self.offset, limit = self.limit))]
    async fn fetch_page(&self) -> Result<Vec<NodeEdge>, HierarchyError> {
        let page = match self.source.get_edge_page(self.offset, self.limit).await {
            Ok(page) => page,
            Err(e @ HierarchyError::InvalidVertex(_)) => {
                tracing::error!("Malformed edge page at offset {}: {}", self.offset, e);
                return Err(e);
            }
            Err(first) => {
                tracing::warn!("Edge page fetch failed, retrying once: {}", first);
                self.source
                    .get_edge_page(self.offset, self.limit)
                    .await
                    .map_err(|e| match e {
                        HierarchyError::InvalidVertex(_) => e,
                        e => {
                            tracing::error!("Edge page fetch failed after retry: {}", e);
                            HierarchyError::Startup(format!(
                                "could not fetch edges at offset {} (limit {}): {e}",
                                self.offset, self.limit
                            ))
                        }
                    })?
            }
        };
        tracing::debug!("Fetched {} pairs", page.len());
        Ok(page)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Pairs read from the source.
    pub pairs: usize,
    /// Pairs without a parent.
    pub roots: usize,
    /// Add-edge changes applied.
    pub edges: usize,
}

/// Drain `source` into the graph behind `processor`, waiting for each change to be applied before
/// reading the next pair.
#[tracing::instrument(skip(source, processor))]
pub async fn load_hierarchy<S: EdgeSource>(
    source: &S,
    processor: &ChangeProcessor,
    page_size: usize,
) -> Result<LoadReport, HierarchyError> {
    let started = Instant::now();
    match source.count().await {
        Ok(total) => tracing::info!("Loading hierarchy of {} nodes", total),
        Err(e) => tracing::warn!("Could not count persisted nodes: {}", e),
    }

    let mut report = LoadReport::default();
    let mut pairs = EdgeIter::new(source, page_size);
    while let Some(pair) = pairs.next().await? {
        report.pairs += 1;
        if pair.is_root() {
            report.roots += 1;
        }
        let edge = pair.into_edge();
        let is_edge = !edge.is_nil();
        let description = edge.to_string();
        processor.add_edge(edge).await.map_err(|e| {
            HierarchyError::Startup(format!("could not apply edge {description}: {e}"))
        })?;
        if is_edge {
            report.edges += 1;
        }
    }

    tracing::info!(
        "Loaded {} pairs ({} roots, {} edges) in {:?}",
        report.pairs,
        report.roots,
        report.edges,
        started.elapsed()
    );
    Ok(report)
}

/// Build the graph described by `config`, start its change processor and load `source` into it.
pub async fn bootstrap<S: EdgeSource>(
    config: &HierarchyConfig,
    source: &S,
) -> Result<(HierarchyTree, ChangeProcessor, LoadReport), HierarchyError> {
    config.validate()?;
    let cache = config.build_cache()?;
    let graph =
        Arc::new(DynamicGraph::new(cache).with_max_cache_entries(config.max_cache_entries));
    let (processor, _worker) = ChangeProcessor::spawn(graph.clone(), config.page_size);
    let report = load_hierarchy(source, &processor, config.page_size).await?;
    tracing::info!("Hierarchy graph ready with {} edges", graph.size());
    Ok((HierarchyTree::new(graph), processor, report))
}
