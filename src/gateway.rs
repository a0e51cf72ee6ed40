//! The gateway ties routing, cache storage, and the network together.

use color_eyre::{eyre::eyre, Result};
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheStorage, CacheStore};
use crate::config::Config;
use crate::net::{CachedResponse, Fetcher};
use crate::request::Request;
use crate::router::{Router, RuleSet, StrategyKind};
use crate::strategy::{
  CacheFirst, NetworkFirst, PassThrough, ShellConfig, Strategy, StrategyContext,
};

/// Resolves requests through the rule table and caching strategies.
///
/// Built once at startup; refuses to start on a malformed rule or
/// exclusion pattern.
pub struct Gateway<S: CacheStorage, F: Fetcher> {
  router: Router,
  store: CacheStore<S>,
  fetcher: F,
  network_first: NetworkFirst,
  shell_cache: String,
  precache_paths: Vec<String>,
}

impl<S: CacheStorage, F: Fetcher> Gateway<S, F> {
  pub fn new(config: &Config, storage: S, fetcher: F) -> Result<Self> {
    let rules = RuleSet::compile(&config.rules)?;

    let exclude = Regex::new(&config.app_shell.exclude).map_err(|e| {
      eyre!(
        "Invalid app shell exclusion pattern '{}': {}",
        config.app_shell.exclude,
        e
      )
    })?;

    let network_first = NetworkFirst::new(ShellConfig {
      path: config.app_shell.path.clone(),
      exclude,
      cache_name: config.app_shell.cache.clone(),
    });

    let mut precache_paths = vec![config.app_shell.path.clone()];
    for path in &config.precache {
      if !precache_paths.contains(path) {
        precache_paths.push(path.clone());
      }
    }

    Ok(Self {
      router: Router::new(rules),
      store: CacheStore::new(storage),
      fetcher,
      network_first,
      shell_cache: config.app_shell.cache.clone(),
      precache_paths,
    })
  }

  #[allow(dead_code)]
  pub fn store(&self) -> &CacheStore<S> {
    &self.store
  }

  /// Resolve one request: route, then run the selected strategy.
  pub async fn handle(&self, request: &Request) -> Result<CachedResponse> {
    let decision = self.router.route(request);
    debug!(
      url = %request.url,
      strategy = ?decision.strategy,
      cache = decision.cache_name().unwrap_or("-"),
      "Routed request"
    );

    let partition = decision
      .rule
      .map(|rule| self.store.partition(&rule.cache_name, rule.max_entries));

    let ctx = StrategyContext {
      request,
      partition,
      store: &self.store,
      fetcher: &self.fetcher,
    };

    match decision.strategy {
      StrategyKind::CacheFirst => CacheFirst.execute(&ctx).await,
      StrategyKind::NetworkFirst => self.network_first.execute(&ctx).await,
      StrategyKind::PassThrough => PassThrough.execute(&ctx).await,
    }
  }

  /// Fetch the app shell and any configured precache paths from an origin
  /// and store them in the shell partition. Returns how many were stored.
  pub async fn precache(&self, origin: &str) -> Result<usize> {
    let base = Url::parse(origin).map_err(|e| eyre!("Invalid origin {}: {}", origin, e))?;
    let partition = self.store.partition(&self.shell_cache, None);
    let mut stored = 0;

    for path in &self.precache_paths {
      let url = base
        .join(path)
        .map_err(|e| eyre!("Failed to resolve precache path {}: {}", path, e))?;

      let response = self.fetcher.fetch(url.as_str()).await?;
      if response.is_success() {
        // Keyed by the requested URL so shell lookups find it, regardless
        // of redirects.
        partition.put(url.as_str(), &response)?;
        stored += 1;
      } else {
        warn!(url = %url, status = response.status, "Skipping precache of non-success response");
      }
    }

    Ok(stored)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::config::Config;
  use crate::strategy::testing::StaticFetcher;

  const SITE_CONFIG: &str = r#"
rules:
  - pattern: "/images/"
    strategy: cache-first
    cache: image-cache
    max_entries: 50
  - pattern: "/webcomponentsjs/.*\\.js"
    strategy: cache-first
    cache: webcomponentsjs-polyfills-cache
  - pattern: "/(docs|start|toolbox)/"
    strategy: network-first
    cache: docs-cache
    max_entries: 100
  - pattern: "/samples/"
    strategy: cache-first
    cache: samples-cache
    max_entries: 20
"#;

  fn gateway(fetcher: StaticFetcher) -> Gateway<MemoryStorage, StaticFetcher> {
    let config = Config::from_yaml(SITE_CONFIG).unwrap();
    Gateway::new(&config, MemoryStorage::new(), fetcher).unwrap()
  }

  #[tokio::test]
  async fn test_docs_navigation_gets_precached_shell() {
    let shell_url = "https://example.com/app-shell.html";
    let fetcher = StaticFetcher::new().with_page(shell_url, "shell");
    let gw = gateway(fetcher);

    let stored = gw.precache("https://example.com/").await.unwrap();
    assert_eq!(stored, 1);

    let response = gw
      .handle(&Request::navigate("https://example.com/docs/start"))
      .await
      .unwrap();
    assert_eq!(response.body_text(), "shell");
  }

  #[tokio::test]
  async fn test_samples_navigation_is_cache_first() {
    let url = "https://example.com/samples/foo";
    let fetcher = StaticFetcher::new().with_page(url, "sample");
    let gw = gateway(fetcher);

    let first = gw.handle(&Request::navigate(url)).await.unwrap();
    assert_eq!(first.body_text(), "sample");

    // Second hit comes from samples-cache without a network call.
    let second = gw.handle(&Request::navigate(url)).await.unwrap();
    assert_eq!(second.body_text(), "sample");

    let stats = gw.store().stats().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].name, "samples-cache");
  }

  #[tokio::test]
  async fn test_unmatched_request_passes_through_uncached() {
    let url = "https://example.com/api/search";
    let fetcher = StaticFetcher::new().with_page(url, "results");
    let gw = gateway(fetcher);

    let response = gw.handle(&Request::sub_resource(url)).await.unwrap();
    assert_eq!(response.body_text(), "results");
    assert!(gw.store().stats().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_navigation_without_shell_falls_back_to_network() {
    let url = "https://example.com/docs/es6";
    let fetcher = StaticFetcher::new().with_page(url, "page");
    let gw = gateway(fetcher);

    // No precache ran; the shell is absent but the request still resolves.
    let response = gw.handle(&Request::navigate(url)).await.unwrap();
    assert_eq!(response.body_text(), "page");
  }

  #[test]
  fn test_malformed_rule_refuses_to_start() {
    let config = Config::from_yaml(
      r#"
rules:
  - pattern: "/(docs|start/"
    strategy: network-first
    cache: docs-cache
"#,
    )
    .unwrap();

    let result = Gateway::new(&config, MemoryStorage::new(), StaticFetcher::new());
    assert!(result.is_err());
  }

  #[test]
  fn test_malformed_exclusion_refuses_to_start() {
    let mut config = Config::from_yaml("rules: []").unwrap();
    config.app_shell.exclude = "samples(".to_string();

    let result = Gateway::new(&config, MemoryStorage::new(), StaticFetcher::new());
    assert!(result.is_err());
  }
}
