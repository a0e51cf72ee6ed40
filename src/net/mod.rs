//! Network fetching and the response representation shared with the cache.

mod fetcher;
mod response;

pub use fetcher::{Fetcher, HttpFetcher};
pub use response::CachedResponse;
