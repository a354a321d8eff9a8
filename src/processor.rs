//! Single-writer change pipeline for the [`DynamicGraph`].
//!
//! Producers submit [`GraphChange`] requests through a bounded queue. One worker applies them in
//! arrival order and answers each request on its own reply channel, so concurrent producers (the
//! startup loader, a live "create node" request) never interleave edits in an undefined order.
//! A full queue makes `submit` wait until the worker catches up.

use std::{fmt, sync::Arc};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{error::HierarchyError, graph::DynamicGraph, vertex::Edge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    AddEdge,
    RemoveEdge,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::AddEdge => write!(f, "add-edge"),
            ChangeKind::RemoveEdge => write!(f, "remove-edge"),
        }
    }
}

#[derive(Debug)]
pub struct GraphChange {
    pub kind: ChangeKind,
    pub edge: Edge,
    pub respond_to: oneshot::Sender<Result<(), HierarchyError>>,
}

/// Clonable submission handle. The worker stops once every handle is dropped and the queue is
/// drained.
#[derive(Debug, Clone)]
pub struct ChangeProcessor {
    tx: mpsc::Sender<GraphChange>,
}

impl ChangeProcessor {
    /// Start the worker and return the handle plus the worker's [`JoinHandle`], which resolves to
    /// the number of changes processed. Graph edits may block on cache I/O, so the worker runs on
    /// tokio's blocking pool. Must be called from within a tokio runtime.
    pub fn spawn(graph: Arc<DynamicGraph>, capacity: usize) -> (Self, JoinHandle<usize>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::task::spawn_blocking(move || run(graph, rx));
        (ChangeProcessor { tx }, worker)
    }

    /// Queue `kind` of `edge` and wait until it has been applied.
    pub async fn submit(&self, kind: ChangeKind, edge: Edge) -> Result<(), HierarchyError> {
        let (respond_to, response) = oneshot::channel();
        self.tx
            .send(GraphChange {
                kind,
                edge,
                respond_to,
            })
            .await?;
        response.await?
    }

    pub async fn add_edge(&self, edge: Edge) -> Result<(), HierarchyError> {
        self.submit(ChangeKind::AddEdge, edge).await
    }

    pub async fn remove_edge(&self, edge: Edge) -> Result<(), HierarchyError> {
        self.submit(ChangeKind::RemoveEdge, edge).await
    }
}

fn apply(graph: &DynamicGraph, kind: ChangeKind, edge: &Edge) -> Result<(), HierarchyError> {
    if edge.is_nil() {
        return Ok(());
    }
    match kind {
        ChangeKind::AddEdge => graph.add_edge(edge),
        ChangeKind::RemoveEdge => graph.remove_edge(edge),
    }
}

fn run(graph: Arc<DynamicGraph>, mut rx: mpsc::Receiver<GraphChange>) -> usize {
    tracing::info!("Change processor started");
    let mut processed = 0;
    while let Some(change) = rx.blocking_recv() {
        let result = apply(&graph, change.kind, &change.edge);
        if let Err(e) = &result {
            tracing::warn!("Failed to apply {} of {}: {}", change.kind, change.edge, e);
        }
        processed += 1;
        // the submitter may have stopped waiting
        let _ = change.respond_to.send(result);
    }
    tracing::info!("Change processor stopped after {} changes", processed);
    processed
}
