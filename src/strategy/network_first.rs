//! Network-first strategy with the app-shell shortcut for navigations.

use color_eyre::{eyre::eyre, Report, Result};
use futures::future::BoxFuture;
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use crate::cache::CacheStorage;
use crate::net::{CachedResponse, Fetcher};
use crate::request::RequestMode;

use super::{fetch_and_store, Strategy, StrategyContext};

/// Where the app shell lives and which navigations it applies to.
#[derive(Debug, Clone)]
pub struct ShellConfig {
  /// Shell path, resolved against the request's origin
  pub path: String,
  /// Navigations matching this pattern never get the shell
  pub exclude: Regex,
  /// Partition the shell was precached into
  pub cache_name: String,
}

/// Network-first with an app-shell shortcut.
///
/// Navigations outside the exclusion pattern are answered with the cached
/// app shell when it is present: a strict hit-or-fallback, no
/// revalidation. A missing shell, or any failure while looking it up, is
/// logged and degrades to the plain network-first path. On network failure
/// the cached copy of the exact request URL is served; with none, the
/// network error surfaces.
pub struct NetworkFirst {
  shell: ShellConfig,
}

impl NetworkFirst {
  pub fn new(shell: ShellConfig) -> Self {
    Self { shell }
  }

  /// Shell eligibility: navigations only, excluded paths never.
  fn wants_shell(&self, ctx_url: &str, mode: RequestMode) -> bool {
    mode == RequestMode::Navigate && !self.shell.exclude.is_match(ctx_url)
  }

  fn shell_entry<S: CacheStorage, F: Fetcher>(
    &self,
    ctx: &StrategyContext<'_, S, F>,
  ) -> Result<Option<CachedResponse>> {
    let base = Url::parse(&ctx.request.url)
      .map_err(|e| eyre!("Invalid request URL {}: {}", ctx.request.url, e))?;
    let shell_url = base
      .join(&self.shell.path)
      .map_err(|e| eyre!("Failed to resolve app shell path: {}", e))?;

    let partition = ctx.store.partition(&self.shell.cache_name, None);
    Ok(partition.get(shell_url.as_str())?.map(|entry| entry.response))
  }
}

impl<S: CacheStorage, F: Fetcher> Strategy<S, F> for NetworkFirst {
  fn lookup(&self, ctx: &StrategyContext<'_, S, F>) -> Result<Option<CachedResponse>> {
    if !self.wants_shell(&ctx.request.url, ctx.request.mode) {
      return Ok(None);
    }

    // Any failure here degrades to the network path; the shell gets
    // precached again on the next initialization.
    match self.shell_entry(ctx) {
      Ok(Some(shell)) => Ok(Some(shell)),
      Ok(None) => {
        warn!(
          shell = %self.shell.path,
          url = %ctx.request.url,
          "App shell missing from cache, falling back to network"
        );
        Ok(None)
      }
      Err(err) => {
        warn!(
          shell = %self.shell.path,
          url = %ctx.request.url,
          error = %err,
          "App shell lookup failed, falling back to network"
        );
        Ok(None)
      }
    }
  }

  fn fetch<'a>(
    &'a self,
    ctx: &'a StrategyContext<'a, S, F>,
  ) -> BoxFuture<'a, Result<CachedResponse>> {
    Box::pin(fetch_and_store(ctx))
  }

  fn fallback(&self, ctx: &StrategyContext<'_, S, F>, err: Report) -> Result<CachedResponse> {
    if let Some(partition) = &ctx.partition {
      if let Some(entry) = partition.get(&ctx.request.url)? {
        info!(url = %ctx.request.url, "Network failed, serving cached response");
        return Ok(entry.response);
      }
    }

    Err(err.wrap_err(format!(
      "No cached response for {} and the network attempt failed",
      ctx.request.url
    )))
  }
}
