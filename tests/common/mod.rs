//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use hierarchy_core::vertex::{NodeEdge, Vertex};
use uuid::Uuid;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn vertex(id: &str) -> Vertex {
    Vertex::new(id).unwrap()
}

/// A generated organization chart: a single root with `fanout` children per position, `depth`
/// levels below the root.
#[allow(dead_code)]
pub struct OrgChart {
    pub root: Vertex,
    /// Every position, parents before children.
    pub positions: Vec<Vertex>,
    pub pairs: Vec<NodeEdge>,
}

#[allow(dead_code)]
impl OrgChart {
    pub fn generate(depth: usize, fanout: usize) -> Self {
        let root = Vertex::from(Uuid::new_v4());
        let mut positions = vec![root.clone()];
        let mut pairs = vec![NodeEdge::new(root.clone(), None)];
        let mut level = vec![root.clone()];
        for _ in 0..depth {
            let mut next = Vec::new();
            for parent in level.iter() {
                for _ in 0..fanout {
                    let child = Vertex::from(Uuid::new_v4());
                    pairs.push(NodeEdge::new(child.clone(), Some(parent.clone())));
                    positions.push(child.clone());
                    next.push(child);
                }
            }
            level = next;
        }
        OrgChart {
            root,
            positions,
            pairs,
        }
    }

    /// The last generated position, one of the deepest leaves.
    pub fn leaf(&self) -> &Vertex {
        self.positions.last().unwrap_or(&self.root)
    }
}
