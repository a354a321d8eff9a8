//! # hierarchy-core
//!
//! An in-memory organizational hierarchy graph answering "is X an ancestor of Y" for an
//! authorization layer, backed by a pluggable reachability cache and populated at startup from a
//! paginated persistent edge source.
//!
//! ## Overview
//!
//! Every job position is a vertex; every `parent -> child` relation is a directed edge. Reads
//! (reachability, descendant enumeration, root checks) run concurrently from many request
//! handlers. Writes are serialized through a single change processor and take the graph's
//! exclusive lock, purging the cached answers they may have invalidated.
//!
//! ## Architecture
//!
//! - **[`vertex`]**: [`Vertex`](vertex::Vertex), [`Edge`](vertex::Edge) and the `NIL` sentinel
//! - **[`cache`]**: the [`ReachabilityCache`](cache::ReachabilityCache) contract, an in-memory
//!   cache and a key-value-backed cache (in-process store, or redis with the `redis` feature)
//! - **[`graph`]**: [`DynamicGraph`](graph::DynamicGraph), the adjacency structure and the cached
//!   breadth-first reachability query
//! - **[`processor`]**: [`ChangeProcessor`](processor::ChangeProcessor), the single-writer queue
//! - **[`hierarchy`]**: [`HierarchyTree`](hierarchy::HierarchyTree), the facade used by
//!   authorization code
//! - **[`loader`]**: the [`EdgeSource`](loader::EdgeSource) contract, the paginated
//!   [`EdgeIter`](loader::EdgeIter) and the startup [`bootstrap`](loader::bootstrap)
//! - **`db`** (feature `service`): the SQLite edge source
//! - **[`config`]**: [`HierarchyConfig`](config::HierarchyConfig)
//!
//! ## Quick Start
//!
//! ```rust
//! use hierarchy_core::{
//!     config::HierarchyConfig,
//!     loader::{bootstrap, MemoryEdgeSource},
//!     vertex::{NodeEdge, Vertex},
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ceo = Vertex::new("ceo")?;
//!     let cto = Vertex::new("cto")?;
//!     let engineer = Vertex::new("engineer")?;
//!     let source = MemoryEdgeSource::new(vec![
//!         NodeEdge::new(ceo.clone(), None),
//!         NodeEdge::new(cto.clone(), Some(ceo.clone())),
//!         NodeEdge::new(engineer.clone(), Some(cto.clone())),
//!     ]);
//!
//!     let (tree, _processor, report) = bootstrap(&HierarchyConfig::default(), &source).await?;
//!     assert_eq!(report.edges, 2);
//!     assert!(tree.is_ancestor(&ceo, &engineer)?);
//!     assert!(!tree.is_ancestor(&engineer, &ceo)?);
//!     assert!(tree.is_ancestor(&Vertex::NIL, &ceo)?);
//!     assert!(tree.is_source_vertex(&ceo)?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
#[cfg(feature = "service")]
pub mod db;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod loader;
pub mod processor;
#[cfg(test)]
mod tests;
pub mod vertex;

pub use error::*;
