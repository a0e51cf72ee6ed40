//! CLI command implementations.

use color_eyre::Result;
use regex::Regex;
use std::io::Write;
use tracing::info;

use crate::cache::{CacheStore, SqliteStorage};
use crate::config::Config;
use crate::gateway::Gateway;
use crate::net::HttpFetcher;
use crate::request::Request;
use crate::router::{Router, RuleSet};

fn open_storage(config: &Config) -> Result<SqliteStorage> {
  match &config.cache_db {
    Some(path) => SqliteStorage::open_at(path),
    None => SqliteStorage::open(),
  }
}

fn build_gateway(config: &Config) -> Result<Gateway<SqliteStorage, HttpFetcher>> {
  let storage = open_storage(config)?;
  let fetcher = HttpFetcher::new(config.network.timeout())?;
  Gateway::new(config, storage, fetcher)
}

fn build_request(url: &str, navigate: bool) -> Request {
  if navigate {
    Request::navigate(url)
  } else {
    Request::sub_resource(url)
  }
}

/// Resolve one request through the gateway and write the body to stdout.
pub async fn fetch(config: &Config, url: &str, navigate: bool) -> Result<()> {
  let gateway = build_gateway(config)?;
  let request = build_request(url, navigate);

  let response = gateway.handle(&request).await?;
  info!(
    url = %response.url,
    status = response.status,
    "Request resolved"
  );

  std::io::stdout().write_all(&response.body)?;
  Ok(())
}

/// Dry-run: show which rule a URL would hit, without cache or network.
pub fn routes(config: &Config, url: &str, navigate: bool) -> Result<()> {
  let router = Router::new(RuleSet::compile(&config.rules)?);
  let request = build_request(url, navigate);

  let decision = router.route(&request);
  match decision.rule {
    Some(rule) => {
      let cap = rule
        .max_entries
        .map(|n| format!(", max {} entries", n))
        .unwrap_or_default();
      println!(
        "{} -> {:?} (pattern: {}, cache: {}{})",
        url,
        decision.strategy,
        rule.pattern.as_str(),
        rule.cache_name,
        cap
      );
    }
    None => println!("{} -> PassThrough (no rule matched)", url),
  }

  Ok(())
}

/// Validate the configuration: every rule pattern and the app-shell
/// exclusion must compile.
pub fn check(config: &Config) -> Result<()> {
  let rules = RuleSet::compile(&config.rules)?;
  Regex::new(&config.app_shell.exclude).map_err(|e| {
    color_eyre::eyre::eyre!(
      "Invalid app shell exclusion pattern '{}': {}",
      config.app_shell.exclude,
      e
    )
  })?;

  println!(
    "Configuration OK: {} rule(s), app shell {} (excluding '{}')",
    rules.len(),
    config.app_shell.path,
    config.app_shell.exclude
  );
  Ok(())
}

/// Print per-partition entry counts.
pub fn cache_stats(config: &Config) -> Result<()> {
  let store = CacheStore::new(open_storage(config)?);
  let stats = store.stats()?;

  if stats.is_empty() {
    println!("Cache is empty");
    return Ok(());
  }

  println!("{:<40} {:>8}", "PARTITION", "ENTRIES");
  for partition in stats {
    println!("{:<40} {:>8}", partition.name, partition.entries);
  }
  Ok(())
}

/// Drop one partition, or the whole cache.
pub fn cache_clear(config: &Config, partition: Option<&str>) -> Result<()> {
  let store = CacheStore::new(open_storage(config)?);
  store.clear(partition)?;

  match partition {
    Some(name) => println!("Cleared partition {}", name),
    None => println!("Cleared all partitions"),
  }
  Ok(())
}

/// Fetch the app shell (and configured extras) from an origin into the
/// shell partition.
pub async fn precache(config: &Config, origin: &str) -> Result<()> {
  let gateway = build_gateway(config)?;
  let stored = gateway.precache(origin).await?;

  println!("Precached {} resource(s) from {}", stored, origin);
  Ok(())
}
