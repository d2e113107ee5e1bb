use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One stored translation
#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    /// Unix seconds at insertion
    stored_at: u64,
    text: String,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Disk-based translation cache using sled.
///
/// Entries older than `ttl_seconds` are treated as missing and removed on
/// read; a TTL of 0 keeps entries forever.
pub struct DiskCache {
    db: Db,
    ttl_seconds: u64,
}

impl DiskCache {
    pub fn new(path: impl AsRef<Path>, ttl_seconds: u64) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::CacheInit(format!(
                    "Failed to create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = sled::open(path).map_err(|e| {
            let err_str = e.to_string();
            // Lock errors get an actionable message
            if err_str.contains("WouldBlock") || err_str.contains("lock") {
                Error::CacheInit(format!(
                    "Cache locked at {}\n\n\
                    Another process is using the cache, or a previous instance crashed.\n\
                    To fix: rm {}/db/LOCK",
                    path.display(),
                    path.display()
                ))
            } else {
                Error::CacheInit(format!("Failed to open cache at {}: {}", path.display(), e))
            }
        })?;

        debug!("Opened disk cache at {}", path.display());

        Ok(Self { db, ttl_seconds })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, now_secs())
    }

    fn get_at(&self, key: &str, now: u64) -> Option<String> {
        let raw = match self.db.get(key.as_bytes()) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read error: {}", e);
                return None;
            }
        };

        let entry: Entry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unreadable cache entry {key}: {e}");
                self.discard(key);
                return None;
            }
        };

        if self.ttl_seconds > 0 && now.saturating_sub(entry.stored_at) > self.ttl_seconds {
            debug!("Cache entry {key} expired");
            self.discard(key);
            return None;
        }

        Some(entry.text)
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.db.remove(key.as_bytes()) {
            warn!("Cache remove error for {key}: {e}");
        }
    }

    pub fn insert(&self, key: &str, value: &str) -> Result<()> {
        self.insert_at(key, value, now_secs())
    }

    fn insert_at(&self, key: &str, value: &str, stored_at: u64) -> Result<()> {
        let entry = Entry {
            stored_at,
            text: value.to_string(),
        };
        let bytes = serde_json::to_vec(&entry).map_err(|e| Error::CacheWrite(e.to_string()))?;

        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| Error::CacheWrite(e.to_string()))?;

        self.db
            .flush()
            .map_err(|e| Error::CacheWrite(format!("Flush failed: {e}")))?;

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.db.clear().map_err(|e| Error::CacheWrite(e.to_string()))?;
        self.db
            .flush()
            .map_err(|e| Error::CacheWrite(format!("Flush failed: {e}")))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}
