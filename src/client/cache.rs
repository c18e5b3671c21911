//! Durable key/value cache
//!
//! File-backed cache for large, slowly-changing reference data (the player
//! catalog). One JSON file per key, holding the serialized payload plus the
//! timestamp of the fetch that produced it. Caching here is strictly a
//! performance optimization: every failure is logged and reported as a
//! boolean, never raised, and corrupt entries behave as misses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    /// JSON-serialized payload.
    data: String,
    /// Fetch time of `data` (epoch ms), not the write time.
    timestamp: i64,
}

/// Disk-backed cache with one entry per key. Cloning is cheap; clones share
/// the same directory. Last write per key wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_dir: PathBuf,
}

impl CacheStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys are simple identifiers, but keep the filename safe anyway.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{}.json", safe))
    }

    /// Read an entry. Returns the deserialized payload with its original
    /// fetch timestamp, or `None` when the entry is missing or corrupt.
    /// Corrupt entries are best-effort deleted so they are not re-parsed on
    /// every read.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<(T, i64)> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => return None,
        };

        let parsed = serde_json::from_slice::<CacheEntry>(&bytes)
            .ok()
            .and_then(|entry| {
                let data = serde_json::from_str::<T>(&entry.data).ok()?;
                Some((data, entry.timestamp))
            });

        if parsed.is_none() {
            warn!("Corrupt cache entry for {:?}, evicting", key);
            let _ = fs::remove_file(&path).await;
        }

        parsed
    }

    /// Write an entry, overwriting any prior value for the key. Returns
    /// whether the write succeeded; failures are logged, never fatal.
    pub async fn set<T: Serialize>(&self, key: &str, data: &T, timestamp: i64) -> bool {
        if let Err(e) = fs::create_dir_all(&self.cache_dir).await {
            warn!("Failed to create cache directory: {}", e);
            return false;
        }

        let data = match serde_json::to_string(data) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize cache entry for {:?}: {}", key, e);
                return false;
            }
        };

        let entry = CacheEntry {
            key: key.to_string(),
            data,
            timestamp,
        };
        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize cache entry for {:?}: {}", key, e);
                return false;
            }
        };

        match fs::write(self.entry_path(key), bytes).await {
            Ok(()) => {
                debug!("Cached {:?} ({} bytes)", key, entry.data.len());
                true
            }
            Err(e) => {
                warn!("Failed to write cache entry for {:?}: {}", key, e);
                false
            }
        }
    }

    /// Best-effort delete of one entry.
    pub async fn delete(&self, key: &str) -> bool {
        match fs::remove_file(self.entry_path(key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to delete cache entry for {:?}: {}", key, e);
                false
            }
        }
    }

    /// Best-effort removal of every entry in the cache directory.
    pub async fn clear(&self) -> bool {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                warn!("Failed to read cache directory: {}", e);
                return false;
            }
        };

        let mut ok = true;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.path().extension().is_some_and(|ext| ext == "json")
                && fs::remove_file(entry.path()).await.is_err()
            {
                ok = false;
            }
        }
        ok
    }
}
