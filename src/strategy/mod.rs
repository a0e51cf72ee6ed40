//! Caching strategies.
//!
//! Every strategy implements the same three-step interface: `lookup` a
//! cached answer, `fetch` from the network, `fallback` when the network
//! fails. `execute` composes them: a lookup hit resolves the request
//! immediately, otherwise the network is tried exactly once, and only then
//! the fallback. No retries.

use color_eyre::{Report, Result};
use futures::future::BoxFuture;

use crate::cache::{CacheStorage, CacheStore, Partition};
use crate::net::{CachedResponse, Fetcher};
use crate::request::Request;

mod cache_first;
mod network_first;

pub use cache_first::CacheFirst;
pub use network_first::{NetworkFirst, ShellConfig};

/// Everything a strategy may touch while resolving one request.
pub struct StrategyContext<'a, S: CacheStorage, F: Fetcher> {
  pub request: &'a Request,
  /// Partition selected by the matched rule; None for pass-through.
  pub partition: Option<Partition<S>>,
  /// Store handle, for partitions beyond the rule's own (the app shell).
  pub store: &'a CacheStore<S>,
  pub fetcher: &'a F,
}

/// The single strategy interface, dispatched by `StrategyKind` tag.
pub trait Strategy<S: CacheStorage, F: Fetcher>: Send + Sync {
  /// Try to resolve the request from cache alone.
  fn lookup(&self, ctx: &StrategyContext<'_, S, F>) -> Result<Option<CachedResponse>>;

  /// Resolve over the network (and store, where the strategy caches).
  fn fetch<'a>(&'a self, ctx: &'a StrategyContext<'a, S, F>) -> BoxFuture<'a, Result<CachedResponse>>;

  /// Last resort after a failed fetch.
  fn fallback(&self, ctx: &StrategyContext<'_, S, F>, err: Report) -> Result<CachedResponse>;

  /// lookup -> hit? done : fetch -> error? fallback.
  fn execute<'a>(
    &'a self,
    ctx: &'a StrategyContext<'a, S, F>,
  ) -> BoxFuture<'a, Result<CachedResponse>> {
    Box::pin(async move {
      if let Some(hit) = self.lookup(ctx)? {
        return Ok(hit);
      }

      match self.fetch(ctx).await {
        Ok(response) => Ok(response),
        Err(err) => self.fallback(ctx, err),
      }
    })
  }
}

/// Fetch the request URL and store successful responses into the rule's
/// partition. Shared by the caching strategies.
pub(crate) async fn fetch_and_store<S: CacheStorage, F: Fetcher>(
  ctx: &StrategyContext<'_, S, F>,
) -> Result<CachedResponse> {
  let response = ctx.fetcher.fetch(&ctx.request.url).await?;

  if response.is_success() {
    if let Some(partition) = &ctx.partition {
      partition.put(&ctx.request.url, &response)?;
    }
  }

  Ok(response)
}

/// Plain network fetch with no cache involvement. The default when no rule
/// matches a request.
pub struct PassThrough;

impl<S: CacheStorage, F: Fetcher> Strategy<S, F> for PassThrough {
  fn lookup(&self, _ctx: &StrategyContext<'_, S, F>) -> Result<Option<CachedResponse>> {
    Ok(None)
  }

  fn fetch<'a>(
    &'a self,
    ctx: &'a StrategyContext<'a, S, F>,
  ) -> BoxFuture<'a, Result<CachedResponse>> {
    ctx.fetcher.fetch(&ctx.request.url)
  }

  fn fallback(&self, _ctx: &StrategyContext<'_, S, F>, err: Report) -> Result<CachedResponse> {
    Err(err)
  }
}
