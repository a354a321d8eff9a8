use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::Path,
    sync::Arc,
};

use crate::{
    cache::{MemoryCache, ReachabilityCache},
    error::HierarchyError,
    vertex::KEY_SEPARATOR,
};

pub const DEFAULT_PAGE_SIZE: usize = 100;
/// Upper bound on `page_size`, which also sizes the change queue.
pub const MAX_PAGE_SIZE: usize = 100_000;
pub const DEFAULT_CACHE_PREFIX: &str = "e";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Key namespace for key-value-backed caches.
    pub prefix: String,
    pub url: String,
    /// Per-key time to live in seconds; 0 keeps keys forever.
    pub expire_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            backend: CacheBackend::default(),
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            url: DEFAULT_REDIS_URL.to_string(),
            expire_secs: 0,
        }
    }
}

/// Everything needed to build a hierarchy graph. Passed explicitly to constructors; there is no
/// process-wide configuration state.
///
/// ```toml
/// page_size = 500
/// max_cache_entries = 100000
///
/// [cache]
/// backend = "redis"
/// url = "redis://cache.internal/"
/// expire_secs = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Bulk-load page size, also the capacity of the change queue.
    pub page_size: usize,
    /// Clear the reachability cache once it holds more entries than this.
    pub max_cache_entries: Option<usize>,
    pub cache: CacheConfig,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        HierarchyConfig {
            page_size: DEFAULT_PAGE_SIZE,
            max_cache_entries: None,
            cache: CacheConfig::default(),
        }
    }
}

impl HierarchyConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, HierarchyError> {
        let config: HierarchyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// A missing file yields the defaults.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, HierarchyError> {
        let path = path.as_ref();
        tracing::debug!("Attempting to read hierarchy config from: {:?}", path);
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(HierarchyConfig::default());
        }
        HierarchyConfig::from_toml_str(&read_to_string(path)?)
    }

    pub fn write_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), HierarchyError> {
        let toml_string = toml::to_string(self)?;
        write(path, toml_string)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), HierarchyError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(HierarchyError::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.cache.prefix.is_empty() || self.cache.prefix.contains(KEY_SEPARATOR) {
            return Err(HierarchyError::Config(format!(
                "cache prefix '{}' must be non-empty and must not contain '{KEY_SEPARATOR}'",
                self.cache.prefix
            )));
        }
        Ok(())
    }

    /// Construct the configured cache variant.
    pub fn build_cache(&self) -> Result<Arc<dyn ReachabilityCache>, HierarchyError> {
        match self.cache.backend {
            CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
            CacheBackend::Redis => self.build_redis_cache(),
        }
    }

    #[cfg(feature = "redis")]
    fn build_redis_cache(&self) -> Result<Arc<dyn ReachabilityCache>, HierarchyError> {
        use crate::cache::{KeyValueCache, RedisStore};

        let store = RedisStore::connect(&self.cache.url, Some(self.cache.expire_secs))?;
        Ok(Arc::new(KeyValueCache::new(
            Arc::new(store),
            self.cache.prefix.clone(),
        )))
    }

    #[cfg(not(feature = "redis"))]
    fn build_redis_cache(&self) -> Result<Arc<dyn ReachabilityCache>, HierarchyError> {
        Err(HierarchyError::Config(
            "the redis cache backend requires the `redis` feature".to_string(),
        ))
    }
}
