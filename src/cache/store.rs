//! Named cache partitions addressed through an explicit store capability.

use color_eyre::Result;
use std::sync::Arc;

use crate::net::CachedResponse;

use super::storage::{CacheStorage, CachedEntry, PartitionStats};

/// Handle to all cache partitions.
///
/// Constructed once at startup and passed to whoever needs cache access;
/// partitions are addressed by name through this handle rather than any
/// ambient global registry.
pub struct CacheStore<S: CacheStorage> {
  storage: Arc<S>,
}

impl<S: CacheStorage> CacheStore<S> {
  /// Create a store over the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  /// Open a handle to a named partition.
  ///
  /// Partitions exist implicitly; opening one never fails and writes create
  /// it on first use.
  pub fn partition(&self, name: &str, max_entries: Option<u32>) -> Partition<S> {
    Partition {
      storage: Arc::clone(&self.storage),
      name: name.to_string(),
      max_entries,
    }
  }

  /// Entry counts for all non-empty partitions.
  pub fn stats(&self) -> Result<Vec<PartitionStats>> {
    self.storage.partitions()
  }

  /// Drop one partition, or everything when `name` is None.
  pub fn clear(&self, name: Option<&str>) -> Result<()> {
    match name {
      Some(name) => self.storage.clear(name),
      None => self.storage.clear_all(),
    }
  }
}

impl<S: CacheStorage> Clone for CacheStore<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}

/// Handle to one named partition, carrying its entry cap.
pub struct Partition<S: CacheStorage> {
  storage: Arc<S>,
  name: String,
  max_entries: Option<u32>,
}

impl<S: CacheStorage> Partition<S> {
  /// Look up the cached response for a URL.
  pub fn get(&self, url: &str) -> Result<Option<CachedEntry>> {
    self.storage.get(&self.name, url)
  }

  /// Store a response, evicting oldest-inserted entries past the cap.
  pub fn put(&self, url: &str, response: &CachedResponse) -> Result<()> {
    self.storage.put(&self.name, url, response, self.max_entries)
  }

  /// Number of entries currently stored.
  pub fn count(&self) -> Result<u32> {
    self.storage.count(&self.name)
  }
}

impl<S: CacheStorage> Clone for Partition<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      name: self.name.clone(),
      max_entries: self.max_entries,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use chrono::Utc;

  fn response(url: &str) -> CachedResponse {
    CachedResponse {
      url: url.to_string(),
      status: 200,
      content_type: None,
      body: Vec::new(),
      fetched_at: Utc::now(),
    }
  }

  #[test]
  fn test_partition_cap_enforced_on_put() {
    let store = CacheStore::new(MemoryStorage::new());
    let partition = store.partition("samples", Some(2));

    partition.put("/samples/a", &response("/samples/a")).unwrap();
    partition.put("/samples/b", &response("/samples/b")).unwrap();
    partition.put("/samples/c", &response("/samples/c")).unwrap();

    assert_eq!(partition.count().unwrap(), 2);
    assert!(partition.get("/samples/a").unwrap().is_none());
    assert!(partition.get("/samples/c").unwrap().is_some());
  }

  #[test]
  fn test_partitions_are_isolated() {
    let store = CacheStore::new(MemoryStorage::new());
    store
      .partition("images", None)
      .put("/x", &response("/x"))
      .unwrap();

    assert!(store.partition("docs", None).get("/x").unwrap().is_none());
    assert!(store.partition("images", None).get("/x").unwrap().is_some());
  }

  #[test]
  fn test_clear_one_and_all() {
    let store = CacheStore::new(MemoryStorage::new());
    store
      .partition("images", None)
      .put("/a", &response("/a"))
      .unwrap();
    store
      .partition("docs", None)
      .put("/b", &response("/b"))
      .unwrap();

    store.clear(Some("images")).unwrap();
    assert_eq!(store.partition("images", None).count().unwrap(), 0);
    assert_eq!(store.partition("docs", None).count().unwrap(), 1);

    store.clear(None).unwrap();
    assert!(store.stats().unwrap().is_empty());
  }
}
