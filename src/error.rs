//! Typed errors for the flatwatch library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Errors are split by
//! concern: transport, AI capability, geo capability, notification,
//! and the pipeline itself.

use thiserror::Error;

/// Errors from fetching external pages (discovery and acquisition).
///
/// Transport errors are isolated per URL by the callers: one failed
/// fetch never aborts a batch, it becomes an explicit failure marker
/// in the result map.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (connection, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status code
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    /// Request timed out
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// The scraping API accepted the request but returned no content
    #[error("empty content for {url}")]
    EmptyContent { url: String },

    /// Scraping API error (quota, anti-bot, upstream block)
    #[error("scrape API error: {0}")]
    Api(String),
}

/// Errors from LLM capability calls (extraction, risk, enrichment).
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the model provider failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Provider returned an error payload
    #[error("API error: {0}")]
    Api(String),

    /// Model output did not parse into the expected structure
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    /// Call timed out
    #[error("AI call timed out")]
    Timeout,

    /// Missing or invalid credentials/configuration
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from the geocoding/routing/places provider.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Provider returned a non-OK status payload
    #[error("maps API error: {0}")]
    Api(String),

    /// Missing or invalid credentials/configuration
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from notification dispatch.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The channel API rejected the message
    #[error("dispatch rejected: {0}")]
    Rejected(String),
}

/// Top-level pipeline errors.
///
/// Stage failures (extract, risk, enrich, notify) are *not* represented
/// here; they are captured as data on the [`crate::ListingRecord`].
/// Only failures that make the run itself meaningless surface as errors:
/// storage failures and cancellation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetch failed (surfaced from discovery helpers, not stages)
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Operation was cancelled before completion
    #[error("operation cancelled")]
    Cancelled,

    /// JSON (de)serialization of persisted fields failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for AI capability calls.
pub type AiResult<T> = std::result::Result<T, AiError>;

/// Result type alias for geo capability calls.
pub type GeoResult<T> = std::result::Result<T, GeoError>;

/// Result type alias for notification dispatch.
pub type NotifyResult<T> = std::result::Result<T, NotifyError>;
