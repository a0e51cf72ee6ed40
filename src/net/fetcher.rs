//! Network backend trait and the reqwest implementation.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use std::time::Duration;

use super::response::CachedResponse;

/// Trait for network backends.
///
/// The gateway only issues GET requests; whether a result is stored is the
/// strategy's call. A timeout is reported the same way as a transport
/// failure, while non-2xx statuses are still responses, not errors.
pub trait Fetcher: Send + Sync {
  /// Fetch a URL, bounded by the implementation's timeout.
  fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<CachedResponse>>;
}

/// reqwest-backed fetcher with a bounded timeout per request.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  timeout: Duration,
}

impl HttpFetcher {
  /// Create a fetcher with the given per-request timeout.
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, timeout })
  }
}

impl Fetcher for HttpFetcher {
  fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<CachedResponse>> {
    Box::pin(async move {
      let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
        .await
        .map_err(|_| eyre!("Network fetch timed out after {:?}: {}", self.timeout, url))?
        .map_err(|e| eyre!("Network fetch failed for {}: {}", url, e))?;

      let status = response.status().as_u16();
      let final_url = response.url().to_string();
      let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

      // The body read shares the same bound as the initial fetch.
      let body = tokio::time::timeout(self.timeout, response.bytes())
        .await
        .map_err(|_| eyre!("Reading response body timed out: {}", url))?
        .map_err(|e| eyre!("Failed to read response body for {}: {}", url, e))?
        .to_vec();

      Ok(CachedResponse {
        url: final_url,
        status,
        content_type,
        body,
        fetched_at: Utc::now(),
      })
    })
  }
}
