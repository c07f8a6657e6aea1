//! Storage traits for the three keyed tables.
//!
//! The persistence layer is split into focused traits:
//! - `LinkStore`: discovered links ("known to exist" cache)
//! - `PageStore`: raw listing pages
//! - `ListingStore`: final structured listings
//! - `Store`: composite trait combining all three
//!
//! Every table is upserted by `(source, external_id)`: insert-or-replace,
//! never insert-or-fail, never append. No table is truncated by normal
//! operation. Concurrent upserts to the same key are serialized by the
//! store (last write wins); upserts to different keys are independent.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::listing::{DiscoveredLink, ListingKey, ListingPage, Source};
use crate::types::record::Listing;

/// Cache of discovered listing links.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert or replace a link by identity.
    async fn upsert_link(&self, link: &DiscoveredLink) -> Result<()>;

    /// Get a link by identity.
    async fn get_link(&self, key: &ListingKey) -> Result<Option<DiscoveredLink>>;

    /// List links, optionally filtered by city. Latest-write state only.
    async fn list_links(&self, city: Option<&str>) -> Result<Vec<DiscoveredLink>>;
}

/// Store for raw listing page content.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Insert or replace a page by identity. Observably atomic: readers
    /// never see a partially written record.
    async fn upsert_page(&self, page: &ListingPage) -> Result<()>;

    /// Get a page by identity.
    async fn get_page(&self, key: &ListingKey) -> Result<Option<ListingPage>>;

    /// List pages, optionally filtered by source. Latest-write state only.
    async fn list_pages(&self, source: Option<Source>) -> Result<Vec<ListingPage>>;
}

/// Store for final structured listings.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Insert or replace a listing by identity. No merge of old and new
    /// field sets: the row is fully replaced.
    async fn upsert_listing(&self, listing: &Listing) -> Result<()>;

    /// Get a listing by identity.
    async fn get_listing(&self, key: &ListingKey) -> Result<Option<Listing>>;

    /// List listings, optionally filtered by source.
    async fn list_listings(&self, source: Option<Source>) -> Result<Vec<Listing>>;
}

/// Composite storage trait combining all three tables.
///
/// This is the trait the pipeline is generic over.
pub trait Store: LinkStore + PageStore + ListingStore {}

// Blanket implementation: anything implementing all three is a Store
impl<T: LinkStore + PageStore + ListingStore> Store for T {}
