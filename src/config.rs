use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::router::RuleConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Ordered caching rules, evaluated top to bottom
  pub rules: Vec<RuleConfig>,
  #[serde(default)]
  pub app_shell: AppShellConfig,
  #[serde(default)]
  pub network: NetworkConfig,
  /// Paths fetched and cached by the `precache` command, relative to the
  /// origin. The app shell path is always included.
  #[serde(default)]
  pub precache: Vec<String>,
  /// Override for the cache database location
  pub cache_db: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppShellConfig {
  /// Shell document path, resolved against each request's origin
  pub path: String,
  /// Navigations matching this pattern are never answered with the shell
  pub exclude: String,
  /// Partition the shell is precached into
  pub cache: String,
}

impl Default for AppShellConfig {
  fn default() -> Self {
    Self {
      path: "/app-shell.html".to_string(),
      exclude: "samples".to_string(),
      cache: "precache".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
  /// Bound on each network attempt, in milliseconds
  pub timeout_ms: u64,
}

impl Default for NetworkConfig {
  fn default() -> Self {
    Self { timeout_ms: 3000 }
  }
}

impl NetworkConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./appshell.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/appshell/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/appshell/config.yaml\n\
                 See appshell.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("appshell.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("appshell").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse a configuration document.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Invalid configuration: {}", e))?;

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::router::StrategyKind;

  const EXAMPLE: &str = r#"
rules:
  - pattern: "/images/"
    strategy: cache-first
    cache: image-cache
    max_entries: 50
  - pattern: "/(docs|start|toolbox)/"
    strategy: network-first
    cache: docs-cache
    max_entries: 100

app_shell:
  path: /app-shell.html
  exclude: samples

network:
  timeout_ms: 2000

precache:
  - /
  - /about
"#;

  #[test]
  fn test_parse_example() {
    let config = Config::from_yaml(EXAMPLE).unwrap();

    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.rules[0].strategy, StrategyKind::CacheFirst);
    assert_eq!(config.rules[0].max_entries, Some(50));
    assert_eq!(config.rules[1].cache, "docs-cache");

    assert_eq!(config.app_shell.path, "/app-shell.html");
    assert_eq!(config.app_shell.cache, "precache"); // default kept
    assert_eq!(config.network.timeout(), Duration::from_millis(2000));
    assert_eq!(config.precache, vec!["/", "/about"]);
  }

  #[test]
  fn test_defaults() {
    let config = Config::from_yaml("rules: []").unwrap();

    assert!(config.rules.is_empty());
    assert_eq!(config.app_shell.exclude, "samples");
    assert_eq!(config.network.timeout_ms, 3000);
    assert!(config.precache.is_empty());
    assert!(config.cache_db.is_none());
  }

  #[test]
  fn test_invalid_yaml_fails() {
    assert!(Config::from_yaml("rules: {not a list}").is_err());
  }

  #[test]
  fn test_unknown_strategy_fails() {
    let bad = r#"
rules:
  - pattern: "/images/"
    strategy: fastest-ever
    cache: image-cache
"#;
    assert!(Config::from_yaml(bad).is_err());
  }
}
