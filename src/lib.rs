//! flatwatch: rental listing discovery and enrichment.
//!
//! Watches German rental portals for new listings and turns raw ad pages
//! into structured, risk-scored, travel-annotated records:
//!
//! 1. **Discover**: scrape portal search results for listing links,
//!    deduplicated by `(source, external_id)` identity
//! 2. **Acquire**: fetch listing pages with bounded concurrency and
//!    per-URL fault isolation
//! 3. **Enrich**: run each page through a linear state machine
//!    (extract → risk score → enrich → notify), recording stage failures
//!    as data on the record
//! 4. **Persist**: upsert the final structured listing by identity
//!
//! All external capabilities sit behind traits ([`Fetcher`],
//! [`ListingAi`], [`MapsClient`], [`Notifier`], [`Store`]), so the
//! pipeline is fully testable with the deterministic doubles in
//! [`testing`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use flatwatch::fetchers::HttpFetcher;
//! use flatwatch::pipeline::{acquire, discover, Pipeline};
//! use flatwatch::stores::MemoryStore;
//! use flatwatch::testing::{MockAi, MockMaps};
//! use flatwatch::types::config::{default_sites, AcquireConfig, DiscoverConfig};
//!
//! # async fn run() -> flatwatch::Result<()> {
//! let fetcher = HttpFetcher::new();
//! let store = Arc::new(MemoryStore::new());
//!
//! let links = discover(&fetcher, &default_sites(), "Bremen", &DiscoverConfig::new()).await?;
//! let pages = acquire(&fetcher, &links, &AcquireConfig::new()).await;
//!
//! let pipeline = Pipeline::new(store, Arc::new(MockAi::new()), Arc::new(MockMaps::new()));
//! for page in pages.into_values().flatten() {
//!     let listing = pipeline.run(page).await?;
//!     println!("{}: {:?}", listing.key, listing.price_eur);
//! }
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod geo;
pub mod notify;
pub mod pipeline;
pub mod scrape;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{
    AiError, FetchError, GeoError, NotifyError, PipelineError, Result,
};
pub use pipeline::Pipeline;
pub use security::SecretString;
pub use traits::ai::ListingAi;
pub use traits::fetcher::Fetcher;
pub use traits::maps::MapsClient;
pub use traits::notifier::Notifier;
pub use traits::store::{LinkStore, ListingStore, PageStore, Store};
pub use types::listing::{DiscoveredLink, ListingKey, ListingPage, Source};
pub use types::record::{Listing, ListingRecord, Stage};
