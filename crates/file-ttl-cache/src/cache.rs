//! The file-backed TTL cache
//!
//! One JSON file per entry under `root/<namespace>/`, mirrored by an
//! in-memory index that serves all reads. The files exist solely so the
//! index can be rebuilt after a restart; corrupt files are deleted on
//! load rather than failing the open.

use crate::namespace::Namespace;
use crate::sweeper::{self, SweeperHandle};
use crate::types::{CacheEntry, CacheStats};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A namespace-scoped expiring key/value store
pub struct TtlCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// `None` when running as the in-memory fallback
    dir: Option<PathBuf>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired_drops: AtomicU64,
    closed: AtomicBool,
}

impl TtlCache {
    /// Open (creating if needed) the store for a namespace
    ///
    /// If the directory cannot be created or scanned the store degrades to
    /// a non-persistent in-memory instance rather than failing: reduced
    /// durability, never a hard error.
    pub async fn open(root: &Path, namespace: &Namespace) -> Self {
        let dir = root.join(namespace.as_str());
        match fs::create_dir_all(&dir).await {
            Ok(()) => {
                let entries = Self::load_entries(&dir).await;
                info!(
                    dir = %dir.display(),
                    entries = entries.len(),
                    "Opened cache namespace"
                );
                Self::with_storage(entries, Some(dir))
            }
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Cache directory unavailable, falling back to in-memory store"
                );
                Self::with_storage(HashMap::new(), None)
            }
        }
    }

    /// Create a purely in-memory store (no persistence across restarts)
    pub fn in_memory() -> Self {
        Self::with_storage(HashMap::new(), None)
    }

    fn with_storage(entries: HashMap<String, CacheEntry>, dir: Option<PathBuf>) -> Self {
        Self {
            entries: RwLock::new(entries),
            dir,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired_drops: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether entries survive a restart
    pub fn is_persistent(&self) -> bool {
        self.dir.is_some()
    }

    /// Rebuild the index from the entry files in `dir`
    async fn load_entries(dir: &Path) -> HashMap<String, CacheEntry> {
        let mut entries = HashMap::new();
        let mut read_dir = match fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to scan cache directory");
                return entries;
            }
        };

        while let Ok(Some(item)) = read_dir.next_entry().await {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = match fs::read(&path).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to read cache file");
                    continue;
                }
            };
            match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) => {
                    entries.insert(entry.key.clone(), entry);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Corrupt cache file, removing");
                    let _ = fs::remove_file(&path).await;
                }
            }
        }
        entries
    }

    /// Persist `value` under `key`, expiring `ttl` from now
    ///
    /// Replaces any prior entry wholesale. Storage failures are logged and
    /// swallowed; a cache write must never fail the caller's operation.
    pub async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(key = %key, "Ignoring set on closed cache");
            return;
        }
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            expires_at_ms: Utc::now().timestamp_millis() + ttl.as_millis() as i64,
        };

        if let Some(dir) = &self.dir {
            match serde_json::to_vec(&entry) {
                Ok(bytes) => {
                    let path = dir.join(Self::file_name(key));
                    if let Err(e) = fs::write(&path, &bytes).await {
                        warn!(key = %key, error = %e, "Failed to persist cache entry");
                    }
                }
                Err(e) => warn!(key = %key, error = %e, "Failed to serialize cache entry"),
            }
        }

        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Fresh read: `None` for missing or expired entries
    ///
    /// An expired row is left in place for stale-tolerant readers; only an
    /// explicit delete or an expiry sweep removes it.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.get_inner(key, false).await
    }

    /// Stale-tolerant read: returns the value even past its expiry
    pub async fn get_with_expired(&self, key: &str) -> Option<serde_json::Value> {
        self.get_inner(key, true).await
    }

    async fn get_inner(&self, key: &str, allow_expired: bool) -> Option<serde_json::Value> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        let entry = { self.entries.read().await.get(key).cloned() };
        let Some(entry) = entry else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if !allow_expired && entry.is_expired() {
            debug!(key = %key, "Cache entry expired");
            self.expired_drops.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.value)
    }

    /// Whether a non-expired entry exists for `key`
    pub async fn has(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).is_some_and(|e| !e.is_expired())
    }

    /// Remove the entry for `key`; returns whether one existed
    pub async fn delete(&self, key: &str) -> bool {
        let existed = self.entries.write().await.remove(key).is_some();
        if existed {
            if let Some(dir) = &self.dir {
                let path = dir.join(Self::file_name(key));
                if let Err(e) = fs::remove_file(&path).await {
                    warn!(key = %key, error = %e, "Failed to remove cache file");
                }
            }
        }
        existed
    }

    /// Remove every entry in the namespace
    pub async fn clear(&self) {
        let keys: Vec<String> = {
            let mut entries = self.entries.write().await;
            let keys = entries.keys().cloned().collect();
            entries.clear();
            keys
        };
        if let Some(dir) = &self.dir {
            for key in keys {
                let _ = fs::remove_file(dir.join(Self::file_name(&key))).await;
            }
        }
    }

    /// Keys of the non-expired entries
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|e| !e.is_expired())
            .map(|e| e.key.clone())
            .collect()
    }

    /// Number of non-expired entries
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Delete every row whose expiry has passed, returning the count
    ///
    /// Safe to race with reads and writes: only rows already expired at
    /// the time of the sweep are touched.
    pub async fn clean_expired(&self) -> usize {
        let now_ms = Utc::now().timestamp_millis();
        let removed: Vec<String> = {
            let mut entries = self.entries.write().await;
            let dead: Vec<String> = entries
                .values()
                .filter(|e| e.is_expired_at(now_ms))
                .map(|e| e.key.clone())
                .collect();
            for key in &dead {
                entries.remove(key);
            }
            dead
        };

        if let Some(dir) = &self.dir {
            for key in &removed {
                if let Err(e) = fs::remove_file(dir.join(Self::file_name(key))).await {
                    warn!(key = %key, error = %e, "Failed to remove expired cache file");
                }
            }
        }

        if !removed.is_empty() {
            debug!(removed = removed.len(), "Removed expired cache entries");
        }
        removed.len()
    }

    /// Start a background task running `clean_expired` on a fixed interval
    ///
    /// The returned handle aborts the task when dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> SweeperHandle {
        sweeper::spawn(Arc::clone(self), every)
    }

    /// Release the store; idempotent and safe even if the store fell back
    /// to in-memory mode at open time
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(persistent = self.is_persistent(), "Cache closed");
        }
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_drops: self.expired_drops.load(Ordering::Relaxed),
        }
    }

    /// On-disk file name for a key (hashed: keys may hold characters the
    /// filesystem won't)
    fn file_name(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{}.json", hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::derive_namespace;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(60);

    async fn open_cache(root: &Path) -> TtlCache {
        TtlCache::open(root, &derive_namespace("https://api.example.org")).await
    }

    #[tokio::test]
    async fn test_set_then_get_before_expiry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;

        cache.set("k", json!({"v": 1}), TTL).await;
        assert_eq!(cache.get("k").await, Some(json!({"v": 1})));
        assert!(cache.has("k").await);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_none_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;
        assert_eq!(cache.get("absent").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_served_by_stale_read_until_cleaned() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;

        cache.set("k", json!("stale"), Duration::ZERO).await;
        assert!(!cache.has("k").await);
        assert_eq!(cache.get("k").await, None);
        // The strict miss leaves the row in place for stale readers.
        assert_eq!(cache.get_with_expired("k").await, Some(json!("stale")));

        cache.clean_expired().await;
        assert_eq!(cache.get_with_expired("k").await, None);
    }

    #[tokio::test]
    async fn test_explicit_delete_removes_stale_row() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;

        cache.set("k", json!("stale"), Duration::ZERO).await;
        assert!(cache.delete("k").await);
        assert_eq!(cache.get_with_expired("k").await, None);
    }

    #[tokio::test]
    async fn test_set_replaces_wholesale() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;

        cache.set("k", json!(1), TTL).await;
        cache.set("k", json!(2), TTL).await;
        assert_eq!(cache.get("k").await, Some(json!(2)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let cache = open_cache(tmp.path()).await;
            cache.set("durable", json!({"x": true}), TTL).await;
        }
        let reopened = open_cache(tmp.path()).await;
        assert_eq!(reopened.get("durable").await, Some(json!({"x": true})));
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let a = TtlCache::open(tmp.path(), &derive_namespace("https://a.example.org")).await;
        let b = TtlCache::open(tmp.path(), &derive_namespace("https://b.example.org")).await;

        a.set("k", json!("from-a"), TTL).await;
        assert_eq!(b.get("k").await, None);
        assert_eq!(a.get("k").await, Some(json!("from-a")));
    }

    #[tokio::test]
    async fn test_clean_expired_removes_exactly_the_dead_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;

        cache.set("dead1", json!(1), Duration::ZERO).await;
        cache.set("dead2", json!(2), Duration::ZERO).await;
        cache.set("live", json!(3), TTL).await;

        assert_eq!(cache.clean_expired().await, 2);
        assert_eq!(cache.get("live").await, Some(json!(3)));
        assert_eq!(cache.get_with_expired("dead1").await, None);

        // Immediately re-running finds nothing left to remove.
        assert_eq!(cache.clean_expired().await, 0);
    }

    #[tokio::test]
    async fn test_keys_and_len_exclude_expired() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;

        cache.set("dead", json!(1), Duration::ZERO).await;
        cache.set("live", json!(2), TTL).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.keys().await, vec!["live".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;

        cache.set("a", json!(1), TTL).await;
        cache.set("b", json!(2), TTL).await;

        assert!(cache.delete("a").await);
        assert!(!cache.delete("a").await);

        cache.clear().await;
        assert!(cache.is_empty().await);

        // Cleared on disk too, not just in the index.
        let reopened = open_cache(tmp.path()).await;
        assert!(reopened.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_dropped_on_open() {
        let tmp = tempfile::tempdir().unwrap();
        let ns = derive_namespace("https://api.example.org");
        let dir = tmp.path().join(ns.as_str());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("garbage.json"), b"not json at all").unwrap();

        let cache = open_cache(tmp.path()).await;
        assert!(cache.is_empty().await);
        assert!(!dir.join("garbage.json").exists());
    }

    #[tokio::test]
    async fn test_unwritable_root_falls_back_to_memory() {
        // Using a file as the cache root makes create_dir_all fail.
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let cache = open_cache(&blocker).await;
        assert!(!cache.is_persistent());

        // Degraded, not broken: the full API still works.
        cache.set("k", json!("v"), TTL).await;
        assert_eq!(cache.get("k").await, Some(json!("v")));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;
        cache.set("k", json!(1), TTL).await;

        cache.close();
        cache.close();
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = open_cache(tmp.path()).await;

        cache.set("k", json!(1), TTL).await;
        cache.get("k").await;
        cache.get("absent").await;

        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Arc::new(open_cache(tmp.path()).await);

        cache.set("dead", json!(1), Duration::ZERO).await;
        let handle = cache.spawn_sweeper(Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get_with_expired("dead").await, None);
        drop(handle);
    }
}
