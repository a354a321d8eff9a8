use parking_lot::RwLock;
use std::{collections::BTreeMap, fmt, sync::Arc};

use super::ReachabilityCache;
use crate::{
    error::HierarchyError,
    vertex::{Edge, Vertex, KEY_SEPARATOR},
};

const TRUE_VALUE: &str = "1";
const FALSE_VALUE: &str = "0";

/// Minimal key-value contract a [`KeyValueCache`] needs from its backing store. Implementations
/// may be in-process or networked.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, HierarchyError>;

    fn set(&self, key: &str, value: &str) -> Result<(), HierarchyError>;

    /// Deleting a missing key is success.
    fn delete(&self, key: &str) -> Result<(), HierarchyError>;

    /// Keys beginning with `prefix`. A scan concurrent with writes may miss or repeat keys.
    fn scan(&self, prefix: &str) -> Result<Vec<String>, HierarchyError>;

    fn size(&self, prefix: &str) -> Result<usize, HierarchyError> {
        Ok(self.scan(prefix)?.len())
    }

    /// Retry a failed delete up to `retries` more times, returning the last error.
    fn delete_with_retry(&self, key: &str, retries: usize) -> Result<(), HierarchyError> {
        let mut result = self.delete(key);
        for _ in 0..retries {
            if result.is_ok() {
                break;
            }
            result = self.delete(key);
        }
        result
    }

    /// Scan-then-delete. Returns the number of keys removed.
    fn delete_by_prefix(&self, prefix: &str) -> Result<usize, HierarchyError> {
        let keys = self.scan(prefix)?;
        for key in keys.iter() {
            self.delete_with_retry(key, 1)?;
        }
        Ok(keys.len())
    }

    fn clear(&self, prefix: &str) -> Result<(), HierarchyError> {
        self.delete_by_prefix(prefix).map(|_| ())
    }
}

/// An ordered in-process [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore(RwLock<BTreeMap<String, String>>);

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, HierarchyError> {
        Ok(self.0.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HierarchyError> {
        self.0.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), HierarchyError> {
        self.0.write().remove(key);
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<String>, HierarchyError> {
        Ok(self
            .0
            .read()
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Reachability cache over a [`KeyValueStore`]. Keys are `<prefix>:<start>:<end>` and values
/// `"1"`/`"0"`, so every entry starting at a vertex lives under `<prefix>:<start>:`.
pub struct KeyValueCache {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl fmt::Debug for KeyValueCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl KeyValueCache {
    pub fn new<P: Into<String>>(store: Arc<dyn KeyValueStore>, prefix: P) -> Self {
        let prefix = prefix.into();
        tracing::info!(
            "Created an instance of key-value reachability cache with key prefix '{}'",
            prefix
        );
        KeyValueCache { store, prefix }
    }

    fn make_key(&self, edge: &Edge) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.prefix, edge.key())
    }

    fn namespace(&self) -> String {
        format!("{}{KEY_SEPARATOR}", self.prefix)
    }

    fn start_namespace(&self, start: &Vertex) -> String {
        format!("{}{KEY_SEPARATOR}{start}{KEY_SEPARATOR}", self.prefix)
    }
}

impl ReachabilityCache for KeyValueCache {
    fn get(&self, edge: &Edge) -> Result<Option<bool>, HierarchyError> {
        let key = self.make_key(edge);
        match self.store.get(&key)?.as_deref() {
            None => Ok(None),
            Some(TRUE_VALUE) => Ok(Some(true)),
            Some(FALSE_VALUE) => Ok(Some(false)),
            Some(other) => Err(HierarchyError::Cache(format!(
                "unexpected value '{other}' stored under key {key}"
            ))),
        }
    }

    fn set(&self, edge: &Edge, value: bool) -> Result<(), HierarchyError> {
        let key = self.make_key(edge);
        let val = if value { TRUE_VALUE } else { FALSE_VALUE };
        if let Err(first) = self.store.set(&key, val) {
            tracing::debug!("Retrying set of key {} after error: {}", key, first);
            if let Err(e) = self.store.set(&key, val) {
                tracing::warn!("Error setting key: {}, value: {}: {}", key, val, e);
                return Err(e);
            }
        }
        tracing::trace!("Set key: {}, value: {}", key, val);
        Ok(())
    }

    fn delete(&self, edge: &Edge) {
        let key = self.make_key(edge);
        if let Err(e) = self.store.delete_with_retry(&key, 1) {
            tracing::warn!("Failed to delete cache key {}: {}", key, e);
        }
    }

    fn clear(&self) -> Result<(), HierarchyError> {
        self.store.clear(&self.namespace()).map_err(|e| {
            HierarchyError::Cache(format!("raised error while clearing cache: {e}"))
        })
    }

    fn size(&self) -> Result<usize, HierarchyError> {
        self.store.size(&self.namespace())
    }

    fn delete_by_prefix(&self, start: &Vertex) -> Result<(), HierarchyError> {
        let removed = self
            .store
            .delete_by_prefix(&self.start_namespace(start))
            .map_err(|e| {
                HierarchyError::Cache(format!(
                    "raised error while deleting cache entries starting at {start}: {e}"
                ))
            })?;
        tracing::debug!("Invalidated {} cache entries starting at {}", removed, start);
        Ok(())
    }
}
