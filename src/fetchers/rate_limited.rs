//! Rate-limited fetcher wrapper.
//!
//! Wraps any [`Fetcher`] with rate limiting using the governor crate.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::traits::fetcher::Fetcher;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A fetcher wrapper that enforces a request-rate ceiling.
///
/// Uses the governor crate for precise rate limiting with burst support.
pub struct RateLimitedFetcher<F: Fetcher> {
    inner: F,
    limiter: Arc<DefaultRateLimiter>,
}

impl<F: Fetcher> RateLimitedFetcher<F> {
    /// Create a new rate-limited fetcher.
    ///
    /// # Arguments
    /// * `fetcher` - The underlying fetcher to wrap
    /// * `requests_per_second` - Maximum requests per second (clamped to ≥ 1)
    pub fn new(fetcher: F, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32)),
        );
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with burst support.
    pub fn with_burst(fetcher: F, requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32)),
        )
        .allow_burst(NonZeroU32::new(burst).unwrap_or(nonzero!(1u32)));

        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Extension trait for easy rate limiting.
pub trait FetcherExt: Fetcher + Sized {
    /// Wrap this fetcher with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedFetcher<Self> {
        RateLimitedFetcher::new(self, requests_per_second)
    }

    /// Wrap with rate limiting and burst support.
    fn rate_limited_with_burst(
        self,
        requests_per_second: u32,
        burst: u32,
    ) -> RateLimitedFetcher<Self> {
        RateLimitedFetcher::with_burst(self, requests_per_second, burst)
    }
}

impl<F: Fetcher + Sized> FetcherExt for F {}
