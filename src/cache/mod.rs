//! Reachability cache storage.
//!
//! A reachability cache maps an [`Edge`] query ("is `end` reachable from `start`") to its boolean
//! answer. Entries are derived data: the graph consults them as an optimization and purges every
//! entry starting at a vertex whenever an edge leaving that vertex changes.
//!
//! # Module Organization
//!
//! - [`memory`]: [`MemoryCache`], a process-local map
//! - [`kv`]: the [`KeyValueStore`] contract, [`MemoryKeyValueStore`] and [`KeyValueCache`], a
//!   cache over any key-value store with prefix-scan invalidation
//! - `redis` (feature `redis`): [`RedisStore`], a networked key-value store
//!
//! ```rust
//! use std::sync::Arc;
//! use hierarchy_core::cache::{KeyValueCache, MemoryKeyValueStore, ReachabilityCache};
//! use hierarchy_core::vertex::{Edge, Vertex};
//!
//! let cache = KeyValueCache::new(Arc::new(MemoryKeyValueStore::default()), "e");
//! let query = Edge::new(Vertex::new("a")?, Vertex::new("b")?);
//! assert_eq!(cache.get(&query)?, None);
//! cache.set(&query, false)?;
//! assert_eq!(cache.get(&query)?, Some(false));
//! # Ok::<(), hierarchy_core::HierarchyError>(())
//! ```

mod kv;
mod memory;
#[cfg(feature = "redis")]
mod redis;

#[cfg(test)]
mod tests;

use crate::{
    error::HierarchyError,
    vertex::{Edge, Vertex},
};

pub use kv::{KeyValueCache, KeyValueStore, MemoryKeyValueStore};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisStore;

pub trait ReachabilityCache: Send + Sync {
    /// The cached answer for `edge`, or `None` when nothing is cached. A miss is not an error.
    fn get(&self, edge: &Edge) -> Result<Option<bool>, HierarchyError>;

    fn set(&self, edge: &Edge, value: bool) -> Result<(), HierarchyError>;

    /// Best effort; a missing entry is success.
    fn delete(&self, edge: &Edge);

    fn clear(&self) -> Result<(), HierarchyError>;

    fn size(&self) -> Result<usize, HierarchyError>;

    /// Remove every entry whose start component is `start`.
    fn delete_by_prefix(&self, start: &Vertex) -> Result<(), HierarchyError>;
}
