//! Fetcher implementations.
//!
//! - [`HttpFetcher`]: plain reqwest, for sites without bot protection
//! - [`ScrapflyFetcher`]: hosted scraping API with JS rendering and
//!   country proxies, for the protected portals
//! - [`RateLimitedFetcher`]: wrapper adding a request-rate ceiling

pub mod http;
pub mod rate_limited;
pub mod scrapfly;

pub use http::HttpFetcher;
pub use rate_limited::{FetcherExt, RateLimitedFetcher};
pub use scrapfly::ScrapflyFetcher;
