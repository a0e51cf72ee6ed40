//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::net::CachedResponse;

/// A single cached response together with storage metadata.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// The cached response
  pub response: CachedResponse,
  /// When the response was written into the partition
  pub cached_at: DateTime<Utc>,
}

/// Entry count for one named partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionStats {
  pub name: String,
  pub entries: u32,
}

/// Trait for cache storage backends.
///
/// All operations are scoped to a named partition. Keys are request URLs;
/// a re-put of an existing URL replaces the stored response and counts as a
/// fresh insertion for eviction ordering (last write wins).
pub trait CacheStorage: Send + Sync {
  /// Look up the cached response for a URL.
  fn get(&self, partition: &str, url: &str) -> Result<Option<CachedEntry>>;

  /// Store a response. When `max_entries` is set, the oldest-inserted
  /// entries beyond the cap are evicted in the same operation, so size
  /// accounting is serialized per partition.
  fn put(
    &self,
    partition: &str,
    url: &str,
    response: &CachedResponse,
    max_entries: Option<u32>,
  ) -> Result<()>;

  /// Number of entries currently in the partition.
  fn count(&self, partition: &str) -> Result<u32>;

  /// Drop every entry in one partition.
  fn clear(&self, partition: &str) -> Result<()>;

  /// Drop every partition.
  fn clear_all(&self) -> Result<()>;

  /// Entry counts for all non-empty partitions, sorted by name.
  fn partitions(&self) -> Result<Vec<PartitionStats>>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the cache database at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// In-memory database. Nothing survives the process.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("appshell").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the response cache.
///
/// INSERT OR REPLACE allocates a fresh rowid, so rowid order is insertion
/// order and a rewritten entry moves to the back of the eviction queue.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS response_cache (
    partition TEXT NOT NULL,
    url_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (partition, url_hash)
);

CREATE INDEX IF NOT EXISTS idx_response_cache_partition
    ON response_cache(partition);
"#;

impl CacheStorage for SqliteStorage {
  fn get(&self, partition: &str, url: &str) -> Result<Option<CachedEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT data, cached_at FROM response_cache
         WHERE partition = ? AND url_hash = ?",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let result: Option<(Vec<u8>, String)> = stmt
      .query_row(params![partition, url_key(url)], |row| {
        Ok((row.get(0)?, row.get(1)?))
      })
      .ok();

    match result {
      Some((data, cached_at_str)) => {
        let response: CachedResponse = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize cached response: {}", e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedEntry { response, cached_at }))
      }
      None => Ok(None),
    }
  }

  fn put(
    &self,
    partition: &str,
    url: &str,
    response: &CachedResponse,
    max_entries: Option<u32>,
  ) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let data =
      serde_json::to_vec(response).map_err(|e| eyre!("Failed to serialize response: {}", e))?;

    conn
      .execute("BEGIN TRANSACTION", [])
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO response_cache (partition, url_hash, url, data, cached_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
        params![partition, url_key(url), url, data],
      )
      .map_err(|e| eyre!("Failed to store response: {}", e))?;

    if let Some(cap) = max_entries {
      // Keep the newest `cap` insertions, delete the rest.
      conn
        .execute(
          "DELETE FROM response_cache WHERE partition = ?1 AND rowid IN (
             SELECT rowid FROM response_cache WHERE partition = ?1
             ORDER BY rowid DESC LIMIT -1 OFFSET ?2
           )",
          params![partition, i64::from(cap)],
        )
        .map_err(|e| eyre!("Failed to evict old entries: {}", e))?;
    }

    conn
      .execute("COMMIT", [])
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn count(&self, partition: &str) -> Result<u32> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let count: u32 = conn
      .query_row(
        "SELECT COUNT(*) FROM response_cache WHERE partition = ?",
        params![partition],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to count entries: {}", e))?;

    Ok(count)
  }

  fn clear(&self, partition: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM response_cache WHERE partition = ?",
        params![partition],
      )
      .map_err(|e| eyre!("Failed to clear partition: {}", e))?;

    Ok(())
  }

  fn clear_all(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM response_cache", [])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    Ok(())
  }

  fn partitions(&self) -> Result<Vec<PartitionStats>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT partition, COUNT(*) FROM response_cache
         GROUP BY partition ORDER BY partition",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let stats: Vec<PartitionStats> = stmt
      .query_map([], |row| {
        Ok(PartitionStats {
          name: row.get(0)?,
          entries: row.get(1)?,
        })
      })
      .map_err(|e| eyre!("Failed to query partitions: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(stats)
  }
}

/// In-memory storage backend, the non-persistent counterpart to
/// [`SqliteStorage`]. Used by tests and when persistence is not wanted.
#[derive(Default)]
pub struct MemoryStorage {
  inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
  // (partition, url_hash) -> entry; seq gives insertion order
  entries: HashMap<(String, String), MemoryEntry>,
  next_seq: u64,
}

struct MemoryEntry {
  response: CachedResponse,
  cached_at: DateTime<Utc>,
  seq: u64,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, partition: &str, url: &str) -> Result<Option<CachedEntry>> {
    let inner = self
      .inner
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(
      inner
        .entries
        .get(&(partition.to_string(), url_key(url)))
        .map(|e| CachedEntry {
          response: e.response.clone(),
          cached_at: e.cached_at,
        }),
    )
  }

  fn put(
    &self,
    partition: &str,
    url: &str,
    response: &CachedResponse,
    max_entries: Option<u32>,
  ) -> Result<()> {
    let mut inner = self
      .inner
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let seq = inner.next_seq;
    inner.next_seq += 1;

    inner.entries.insert(
      (partition.to_string(), url_key(url)),
      MemoryEntry {
        response: response.clone(),
        cached_at: Utc::now(),
        seq,
      },
    );

    if let Some(cap) = max_entries {
      loop {
        let in_partition = inner
          .entries
          .keys()
          .filter(|(p, _)| p == partition)
          .count();
        if in_partition <= cap as usize {
          break;
        }

        // Evict the oldest insertion in this partition.
        let oldest = inner
          .entries
          .iter()
          .filter(|((p, _), _)| p == partition)
          .min_by_key(|(_, e)| e.seq)
          .map(|(k, _)| k.clone());

        match oldest {
          Some(key) => {
            inner.entries.remove(&key);
          }
          None => break,
        }
      }
    }

    Ok(())
  }

  fn count(&self, partition: &str) -> Result<u32> {
    let inner = self
      .inner
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(
      inner
        .entries
        .keys()
        .filter(|(p, _)| p == partition)
        .count() as u32,
    )
  }

  fn clear(&self, partition: &str) -> Result<()> {
    let mut inner = self
      .inner
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    inner.entries.retain(|(p, _), _| p != partition);
    Ok(())
  }

  fn clear_all(&self) -> Result<()> {
    let mut inner = self
      .inner
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    inner.entries.clear();
    Ok(())
  }

  fn partitions(&self) -> Result<Vec<PartitionStats>> {
    let inner = self
      .inner
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut counts: HashMap<&str, u32> = HashMap::new();
    for (p, _) in inner.entries.keys() {
      *counts.entry(p.as_str()).or_default() += 1;
    }

    let mut stats: Vec<PartitionStats> = counts
      .into_iter()
      .map(|(name, entries)| PartitionStats {
        name: name.to_string(),
        entries,
      })
      .collect();
    stats.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(stats)
  }
}

/// Stable fixed-length key for a URL.
fn url_key(url: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  hex::encode(hasher.finalize())
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(url: &str) -> CachedResponse {
    CachedResponse {
      url: url.to_string(),
      status: 200,
      content_type: Some("text/html".to_string()),
      body: url.as_bytes().to_vec(),
      fetched_at: Utc::now(),
    }
  }

  fn eviction_keeps_newest<S: CacheStorage>(storage: &S) {
    for url in ["/a", "/b", "/c"] {
      storage.put("images", url, &response(url), Some(2)).unwrap();
    }

    assert_eq!(storage.count("images").unwrap(), 2);
    assert!(storage.get("images", "/a").unwrap().is_none());
    assert!(storage.get("images", "/b").unwrap().is_some());
    assert!(storage.get("images", "/c").unwrap().is_some());
  }

  fn rewrite_refreshes_position<S: CacheStorage>(storage: &S) {
    storage.put("p", "/a", &response("/a"), Some(2)).unwrap();
    storage.put("p", "/b", &response("/b"), Some(2)).unwrap();
    // Rewriting /a makes it the newest insertion, so /b is now oldest.
    storage.put("p", "/a", &response("/a"), Some(2)).unwrap();
    storage.put("p", "/c", &response("/c"), Some(2)).unwrap();

    assert!(storage.get("p", "/a").unwrap().is_some());
    assert!(storage.get("p", "/b").unwrap().is_none());
    assert!(storage.get("p", "/c").unwrap().is_some());
  }

  #[test]
  fn test_memory_put_get_roundtrip() {
    let storage = MemoryStorage::new();
    storage
      .put("docs", "/docs/start", &response("/docs/start"), None)
      .unwrap();

    let entry = storage.get("docs", "/docs/start").unwrap().unwrap();
    assert_eq!(entry.response.status, 200);
    assert_eq!(entry.response.body, b"/docs/start".to_vec());

    assert!(storage.get("docs", "/docs/other").unwrap().is_none());
    assert!(storage.get("images", "/docs/start").unwrap().is_none());
  }

  #[test]
  fn test_sqlite_put_get_roundtrip() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .put("docs", "/docs/start", &response("/docs/start"), None)
      .unwrap();

    let entry = storage.get("docs", "/docs/start").unwrap().unwrap();
    assert_eq!(entry.response.url, "/docs/start");
    assert_eq!(entry.response.content_type.as_deref(), Some("text/html"));
  }

  #[test]
  fn test_memory_eviction_keeps_newest() {
    eviction_keeps_newest(&MemoryStorage::new());
  }

  #[test]
  fn test_sqlite_eviction_keeps_newest() {
    eviction_keeps_newest(&SqliteStorage::open_in_memory().unwrap());
  }

  #[test]
  fn test_memory_rewrite_refreshes_eviction_position() {
    rewrite_refreshes_position(&MemoryStorage::new());
  }

  #[test]
  fn test_sqlite_rewrite_refreshes_eviction_position() {
    rewrite_refreshes_position(&SqliteStorage::open_in_memory().unwrap());
  }

  #[test]
  fn test_partitions_and_clear() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .put("images", "/i.png", &response("/i.png"), None)
      .unwrap();
    storage.put("docs", "/d", &response("/d"), None).unwrap();
    storage.put("docs", "/e", &response("/e"), None).unwrap();

    let stats = storage.partitions().unwrap();
    assert_eq!(
      stats,
      vec![
        PartitionStats {
          name: "docs".to_string(),
          entries: 2
        },
        PartitionStats {
          name: "images".to_string(),
          entries: 1
        },
      ]
    );

    storage.clear("docs").unwrap();
    assert_eq!(storage.count("docs").unwrap(), 0);
    assert_eq!(storage.count("images").unwrap(), 1);

    storage.clear_all().unwrap();
    assert!(storage.partitions().unwrap().is_empty());
  }
}
