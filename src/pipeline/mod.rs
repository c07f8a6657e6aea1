//! The acquisition and enrichment pipeline.
//!
//! - [`discover`]: search-page discovery of listing links, deduplicated
//!   by identity
//! - [`acquire`]: bounded-concurrency page fetching with per-URL fault
//!   isolation
//! - [`enrich`]: the four-stage enrichment state machine
//! - [`prompts`]: centralized LLM prompts

pub mod acquire;
pub mod discover;
pub mod enrich;
pub mod prompts;

pub use acquire::{acquire, acquire_cancellable, acquire_into_store, AcquireReport, FetchOutcome};
pub use discover::{discover, discover_into_store, DiscoverReport};
pub use enrich::Pipeline;
