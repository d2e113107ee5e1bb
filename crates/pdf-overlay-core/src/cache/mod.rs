//! Translation memo so repeated runs over a document do not pay for the
//! same LLM calls twice.

mod memory;
mod disk;
mod key;

pub use memory::MemoryCache;
pub use disk::DiskCache;
pub use key::CacheKey;

use tracing::warn;

use crate::config::CacheConfig;
use crate::error::Result;

/// Combined cache with memory and disk layers
pub struct TranslationCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = if config.memory_enabled {
            Some(MemoryCache::new(config.memory_max_entries, config.ttl_seconds()))
        } else {
            None
        };

        let disk = if config.disk_enabled {
            let path = config
                .disk_path
                .clone()
                .unwrap_or_else(crate::util::translation_cache_path);
            Some(DiskCache::new(path, config.ttl_seconds())?)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// Memory-only cache, used by tests and one-off runs
    pub fn in_memory(max_entries: u64) -> Self {
        Self {
            memory: Some(MemoryCache::new(max_entries, 0)),
            disk: None,
        }
    }

    /// Get a cached translation
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let key_str = key.to_string();

        if let Some(ref memory) = self.memory
            && let Some(value) = memory.get(&key_str).await
        {
            return Some(value);
        }

        if let Some(ref disk) = self.disk
            && let Some(value) = disk.get(&key_str)
        {
            // Populate memory cache on disk hit
            if let Some(ref memory) = self.memory {
                memory.insert(key_str, value.clone()).await;
            }
            return Some(value);
        }

        None
    }

    /// Store a translation in cache
    pub async fn insert(&self, key: &CacheKey, value: &str) {
        let key_str = key.to_string();

        if let Some(ref memory) = self.memory {
            memory.insert(key_str.clone(), value.to_string()).await;
        }

        if let Some(ref disk) = self.disk
            && let Err(e) = disk.insert(&key_str, value)
        {
            warn!("Failed to persist translation: {e}");
        }
    }

    /// Clear all caches
    pub fn clear(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }

        if let Some(ref disk) = self.disk
            && let Err(e) = disk.clear()
        {
            warn!("Failed to clear disk cache: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Lang;

    fn key(text: &str) -> CacheKey {
        CacheKey::new("gemini", &Lang::auto(), &Lang::new("de"), text)
    }

    #[tokio::test]
    async fn test_disk_hit_populates_memory() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            disk_path: Some(dir.path().join("cache")),
            ..CacheConfig::default()
        };

        {
            let cache = TranslationCache::new(&config).unwrap();
            cache.insert(&key("Hello"), "Hallo").await;
        }

        let cache = TranslationCache::new(&config).unwrap();
        assert_eq!(cache.get(&key("Hello")).await.as_deref(), Some("Hallo"));
        assert_eq!(cache.get(&key("Bye")).await, None);
    }

    #[tokio::test]
    async fn test_disabled_cache_stores_nothing() {
        let cache = TranslationCache::new(&CacheConfig::disabled()).unwrap();
        cache.insert(&key("Hello"), "Hallo").await;
        assert_eq!(cache.get(&key("Hello")).await, None);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = TranslationCache::in_memory(16);
        cache.insert(&key("Hello"), "Hallo").await;
        cache.clear();
        assert_eq!(cache.get(&key("Hello")).await, None);
    }
}
