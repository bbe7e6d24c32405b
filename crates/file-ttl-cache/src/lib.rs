//! File-backed key/value cache with absolute TTL expiry
//!
//! Stores JSON values one file per entry under a namespace-scoped
//! directory, with an in-memory index for fast reads. Entries carry an
//! absolute wall-clock expiry so the cache survives process restarts
//! without losing TTL semantics. A timer-driven sweeper removes dead rows
//! so the on-disk footprint does not grow unbounded.
//!
//! Storage failures never propagate to callers: writes are logged and
//! swallowed, unreadable entries count as misses, and if the cache
//! directory cannot be opened the store degrades to a non-persistent
//! in-memory instance with the same API.

mod cache;
mod namespace;
mod sweeper;
mod types;

pub use cache::TtlCache;
pub use namespace::{derive_namespace, Namespace};
pub use sweeper::SweeperHandle;
pub use types::{CacheEntry, CacheStats};
