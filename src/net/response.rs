//! Response type stored in cache partitions and returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An HTTP response reduced to what is needed to serve it again later.
///
/// This is the unit stored in cache partitions (as serialized JSON) and the
/// value every strategy resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
  /// Final URL the response was fetched from (after redirects)
  pub url: String,
  /// HTTP status code
  pub status: u16,
  /// Content-Type header value, if the server sent one
  pub content_type: Option<String>,
  /// Raw response body
  pub body: Vec<u8>,
  /// When the response was fetched from the network
  pub fetched_at: DateTime<Utc>,
}

impl CachedResponse {
  /// Whether the response has a 2xx status. Only successful responses are
  /// ever written into a cache partition.
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Body as text, replacing invalid UTF-8.
  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}
