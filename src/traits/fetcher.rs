//! Fetcher trait for retrieving external pages.

use async_trait::async_trait;

use crate::error::FetchResult;

/// Fetches a URL and returns its HTML.
///
/// This is a single-attempt primitive: implementations do not retry, and
/// callers that want retries re-invoke for the failed subset. Timeouts are
/// an implementation choice and surface as [`crate::error::FetchError`]
/// like any other transport failure.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one URL, returning the page HTML.
    async fn fetch(&self, url: &str) -> FetchResult<String>;

    /// Fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
