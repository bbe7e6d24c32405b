//! Cache types

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single persisted cache row: key, value, and absolute expiry
///
/// Rows are replaced wholesale on every `set`; there is never more than
/// one live row per key within a namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    /// Absolute wall-clock expiry in epoch milliseconds
    pub expires_at_ms: i64,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Strict reads that found only an expired row
    pub expired_drops: u64,
}
