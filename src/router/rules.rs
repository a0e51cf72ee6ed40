//! Caching rules: URL patterns paired with a strategy and a partition.

use color_eyre::{eyre::eyre, Result};
use regex::Regex;
use serde::Deserialize;

/// Closed set of caching strategies a rule can select.
///
/// Strategy behavior lives in the `strategy` module; rules only carry the
/// tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
  /// Serve from cache when present, fetch and store on miss ("fastest")
  CacheFirst,
  /// Network with bounded timeout, cached fallback, app-shell shortcut for
  /// navigations
  NetworkFirst,
  /// Plain network fetch, nothing cached. Also the default when no rule
  /// matches.
  PassThrough,
}

/// One rule as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
  /// Regular expression matched anywhere in the request URL
  pub pattern: String,
  pub strategy: StrategyKind,
  /// Name of the cache partition this rule reads and writes
  pub cache: String,
  /// Optional cap on partition size, evicted oldest-first
  pub max_entries: Option<u32>,
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct CacheRule {
  pub pattern: Regex,
  pub strategy: StrategyKind,
  pub cache_name: String,
  pub max_entries: Option<u32>,
}

impl CacheRule {
  pub fn matches(&self, url: &str) -> bool {
    self.pattern.is_match(url)
  }
}

/// Ordered, immutable sequence of compiled rules.
///
/// Evaluated top to bottom, first match wins. A malformed pattern fails
/// compilation; the gateway refuses to start rather than skip a rule.
#[derive(Debug, Clone)]
pub struct RuleSet {
  rules: Vec<CacheRule>,
}

impl RuleSet {
  pub fn compile(configs: &[RuleConfig]) -> Result<Self> {
    let mut rules = Vec::with_capacity(configs.len());

    for config in configs {
      let pattern = Regex::new(&config.pattern)
        .map_err(|e| eyre!("Invalid URL pattern '{}': {}", config.pattern, e))?;

      rules.push(CacheRule {
        pattern,
        strategy: config.strategy,
        cache_name: config.cache.clone(),
        max_entries: config.max_entries,
      });
    }

    Ok(Self { rules })
  }

  pub fn rules(&self) -> &[CacheRule] {
    &self.rules
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}
