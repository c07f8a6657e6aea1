//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::traits::store::{LinkStore, ListingStore, PageStore};
use crate::types::listing::{DiscoveredLink, ListingKey, ListingPage, Source};
use crate::types::record::Listing;

/// In-memory store for links, pages, and listings.
///
/// Useful for testing and development. Not suitable for production as
/// data is lost on restart.
pub struct MemoryStore {
    links: RwLock<HashMap<ListingKey, DiscoveredLink>>,
    pages: RwLock<HashMap<ListingKey, ListingPage>>,
    listings: RwLock<HashMap<ListingKey, Listing>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
            pages: RwLock::new(HashMap::new()),
            listings: RwLock::new(HashMap::new()),
        }
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.links.write().unwrap().clear();
        self.pages.write().unwrap().clear();
        self.listings.write().unwrap().clear();
    }

    /// Number of stored links.
    pub fn link_count(&self) -> usize {
        self.links.read().unwrap().len()
    }

    /// Number of stored pages.
    pub fn page_count(&self) -> usize {
        self.pages.read().unwrap().len()
    }

    /// Number of stored listings.
    pub fn listing_count(&self) -> usize {
        self.listings.read().unwrap().len()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn upsert_link(&self, link: &DiscoveredLink) -> Result<()> {
        self.links
            .write()
            .unwrap()
            .insert(link.key.clone(), link.clone());
        Ok(())
    }

    async fn get_link(&self, key: &ListingKey) -> Result<Option<DiscoveredLink>> {
        Ok(self.links.read().unwrap().get(key).cloned())
    }

    async fn list_links(&self, city: Option<&str>) -> Result<Vec<DiscoveredLink>> {
        Ok(self
            .links
            .read()
            .unwrap()
            .values()
            .filter(|link| match city {
                Some(city) => link.city.as_deref() == Some(city),
                None => true,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn upsert_page(&self, page: &ListingPage) -> Result<()> {
        self.pages
            .write()
            .unwrap()
            .insert(page.key.clone(), page.clone());
        Ok(())
    }

    async fn get_page(&self, key: &ListingKey) -> Result<Option<ListingPage>> {
        Ok(self.pages.read().unwrap().get(key).cloned())
    }

    async fn list_pages(&self, source: Option<Source>) -> Result<Vec<ListingPage>> {
        Ok(self
            .pages
            .read()
            .unwrap()
            .values()
            .filter(|page| source.map_or(true, |s| page.key.source == s))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn upsert_listing(&self, listing: &Listing) -> Result<()> {
        self.listings
            .write()
            .unwrap()
            .insert(listing.key.clone(), listing.clone());
        Ok(())
    }

    async fn get_listing(&self, key: &ListingKey) -> Result<Option<Listing>> {
        Ok(self.listings.read().unwrap().get(key).cloned())
    }

    async fn list_listings(&self, source: Option<Source>) -> Result<Vec<Listing>> {
        Ok(self
            .listings
            .read()
            .unwrap()
            .values()
            .filter(|listing| source.map_or(true, |s| listing.key.source == s))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::ContentKind;

    fn key(id: &str) -> ListingKey {
        ListingKey::new(Source::Kleinanzeigen, id)
    }

    #[tokio::test]
    async fn test_page_upsert_replaces() {
        let store = MemoryStore::new();

        let first = ListingPage::new(key("1"), "https://a", ContentKind::Html, "old");
        let second = ListingPage::new(key("1"), "https://a", ContentKind::Html, "new");

        store.upsert_page(&first).await.unwrap();
        store.upsert_page(&second).await.unwrap();

        assert_eq!(store.page_count(), 1);
        let stored = store.get_page(&key("1")).await.unwrap().unwrap();
        assert_eq!(stored.content, "new");
    }

    #[tokio::test]
    async fn test_link_city_filter() {
        let store = MemoryStore::new();

        store
            .upsert_link(&DiscoveredLink::new(key("1"), "https://a").with_city("Bremen"))
            .await
            .unwrap();
        store
            .upsert_link(&DiscoveredLink::new(key("2"), "https://b").with_city("Berlin"))
            .await
            .unwrap();

        let bremen = store.list_links(Some("Bremen")).await.unwrap();
        assert_eq!(bremen.len(), 1);
        assert_eq!(bremen[0].key, key("1"));

        let all = store.list_links(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_key_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get_page(&key("absent")).await.unwrap().is_none());
        assert!(store.get_listing(&key("absent")).await.unwrap().is_none());
    }
}
