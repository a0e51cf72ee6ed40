//! Cache-first ("fastest") strategy.

use color_eyre::{Report, Result};
use futures::future::BoxFuture;

use crate::cache::CacheStorage;
use crate::net::{CachedResponse, Fetcher};

use super::{fetch_and_store, Strategy, StrategyContext};

/// Serve from the partition when present, without touching the network.
/// On a miss, fetch once and store the response (the partition's entry cap
/// applies). A miss with no network is fatal for the request.
pub struct CacheFirst;

impl<S: CacheStorage, F: Fetcher> Strategy<S, F> for CacheFirst {
  fn lookup(&self, ctx: &StrategyContext<'_, S, F>) -> Result<Option<CachedResponse>> {
    let partition = match &ctx.partition {
      Some(partition) => partition,
      None => return Ok(None),
    };

    Ok(partition.get(&ctx.request.url)?.map(|entry| entry.response))
  }

  fn fetch<'a>(
    &'a self,
    ctx: &'a StrategyContext<'a, S, F>,
  ) -> BoxFuture<'a, Result<CachedResponse>> {
    Box::pin(fetch_and_store(ctx))
  }

  fn fallback(&self, ctx: &StrategyContext<'_, S, F>, err: Report) -> Result<CachedResponse> {
    // Lookup already missed; nothing left to serve.
    Err(err.wrap_err(format!(
      "No cached response for {} and the network attempt failed",
      ctx.request.url
    )))
  }
}
