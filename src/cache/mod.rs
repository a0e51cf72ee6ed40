//! Partitioned response cache for offline support.
//!
//! This module provides the storage side of the gateway:
//! - A `CacheStorage` trait with SQLite (persistent) and in-memory backends
//! - Named partitions with an optional entry cap, evicted oldest-first
//! - An explicit `CacheStore` capability instead of a global cache registry

mod storage;
mod store;

pub use storage::{CacheStorage, CachedEntry, MemoryStorage, PartitionStats, SqliteStorage};
pub use store::{CacheStore, Partition};
