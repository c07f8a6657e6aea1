//! SQLite storage implementation.
//!
//! A file-based backend using SQLite. Good for:
//! - Local development
//! - Single-user deployments
//! - Testing with persistent data
//!
//! All three tables are keyed by a unique `(source, external_id)` index and
//! written with `ON CONFLICT .. DO UPDATE` upserts, so a write for an
//! existing identity fully replaces the row in one statement. Lists return
//! latest-first (`created_at DESC`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::{PipelineError, Result};
use crate::traits::store::{LinkStore, ListingStore, PageStore};
use crate::types::listing::{ContentKind, DiscoveredLink, ListingKey, ListingPage, Source};
use crate::types::record::{Listing, NearbyPlace, TravelTime};

/// SQLite-based store for links, pages, and listings.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite:data/listings.db?mode=rwc` - Create file if not exists
    pub async fn new(database_url: &str) -> Result<Self> {
        // A pooled :memory: database would give every connection its own
        // empty database, so memory URLs get a single connection.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(storage_err)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listing_urls (
                source TEXT NOT NULL,
                external_id TEXT NOT NULL,
                url TEXT NOT NULL,
                city TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (source, external_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_listing_urls_city ON listing_urls(city)")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listing_pages (
                source TEXT NOT NULL,
                external_id TEXT NOT NULL,
                url TEXT NOT NULL,
                content_type TEXT NOT NULL,
                content TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (source, external_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                source TEXT NOT NULL,
                external_id TEXT NOT NULL,
                url TEXT NOT NULL,
                address TEXT,
                price_eur REAL,
                price_warm_eur REAL,
                rooms REAL,
                description TEXT,
                details TEXT,
                extract_error TEXT,
                risk_score REAL,
                risk_flags TEXT NOT NULL DEFAULT '[]',
                risk_reasoning TEXT,
                risk_error TEXT,
                travel_times TEXT NOT NULL DEFAULT '[]',
                nearby TEXT NOT NULL DEFAULT '[]',
                description_en TEXT,
                narrative TEXT,
                value_score REAL,
                enrich_error TEXT,
                notified INTEGER NOT NULL DEFAULT 0,
                notify_error TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (source, external_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn storage_err(e: sqlx::Error) -> PipelineError {
    PipelineError::Storage(e.to_string().into())
}

fn parse_source(s: &str) -> Result<Source> {
    s.parse()
        .map_err(|e: String| PipelineError::Storage(e.into()))
}

// Row types for sqlx queries

#[derive(Debug, FromRow)]
struct LinkRow {
    source: String,
    external_id: String,
    url: String,
    city: Option<String>,
}

impl LinkRow {
    fn into_link(self) -> Result<DiscoveredLink> {
        Ok(DiscoveredLink {
            key: ListingKey::new(parse_source(&self.source)?, self.external_id),
            url: self.url,
            city: self.city,
        })
    }
}

#[derive(Debug, FromRow)]
struct PageRow {
    source: String,
    external_id: String,
    url: String,
    content_type: String,
    content: String,
    fetched_at: DateTime<Utc>,
}

impl PageRow {
    fn into_page(self) -> Result<ListingPage> {
        let kind: ContentKind = self
            .content_type
            .parse()
            .map_err(|e: String| PipelineError::Storage(e.into()))?;
        Ok(ListingPage {
            key: ListingKey::new(parse_source(&self.source)?, self.external_id),
            url: self.url,
            kind,
            content: self.content,
            fetched_at: self.fetched_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ListingRow {
    source: String,
    external_id: String,
    url: String,
    address: Option<String>,
    price_eur: Option<f64>,
    price_warm_eur: Option<f64>,
    rooms: Option<f64>,
    description: Option<String>,
    details: Option<String>,
    extract_error: Option<String>,
    risk_score: Option<f64>,
    risk_flags: String,
    risk_reasoning: Option<String>,
    risk_error: Option<String>,
    travel_times: String,
    nearby: String,
    description_en: Option<String>,
    narrative: Option<String>,
    value_score: Option<f64>,
    enrich_error: Option<String>,
    notified: bool,
    notify_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl ListingRow {
    fn into_listing(self) -> Result<Listing> {
        let risk_flags: Vec<String> = serde_json::from_str(&self.risk_flags)?;
        let travel_times: Vec<TravelTime> = serde_json::from_str(&self.travel_times)?;
        let nearby: Vec<NearbyPlace> = serde_json::from_str(&self.nearby)?;

        Ok(Listing {
            key: ListingKey::new(parse_source(&self.source)?, self.external_id),
            url: self.url,
            address: self.address,
            price_eur: self.price_eur,
            price_warm_eur: self.price_warm_eur,
            rooms: self.rooms,
            description: self.description,
            details: self.details,
            extract_error: self.extract_error,
            risk_score: self.risk_score,
            risk_flags,
            risk_reasoning: self.risk_reasoning,
            risk_error: self.risk_error,
            travel_times,
            nearby,
            description_en: self.description_en,
            narrative: self.narrative,
            value_score: self.value_score,
            enrich_error: self.enrich_error,
            notified: self.notified,
            notify_error: self.notify_error,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn upsert_link(&self, link: &DiscoveredLink) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listing_urls (source, external_id, url, city, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (source, external_id) DO UPDATE SET
                url = excluded.url,
                city = excluded.city,
                created_at = excluded.created_at
            "#,
        )
        .bind(link.key.source.as_str())
        .bind(&link.key.external_id)
        .bind(&link.url)
        .bind(&link.city)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn get_link(&self, key: &ListingKey) -> Result<Option<DiscoveredLink>> {
        let row: Option<LinkRow> = sqlx::query_as(
            "SELECT source, external_id, url, city FROM listing_urls \
             WHERE source = ? AND external_id = ?",
        )
        .bind(key.source.as_str())
        .bind(&key.external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(LinkRow::into_link).transpose()
    }

    async fn list_links(&self, city: Option<&str>) -> Result<Vec<DiscoveredLink>> {
        let rows: Vec<LinkRow> = match city {
            Some(city) => sqlx::query_as(
                "SELECT source, external_id, url, city FROM listing_urls \
                 WHERE city = ? ORDER BY created_at DESC",
            )
            .bind(city)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?,
            None => sqlx::query_as(
                "SELECT source, external_id, url, city FROM listing_urls \
                 ORDER BY created_at DESC",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?,
        };

        rows.into_iter().map(LinkRow::into_link).collect()
    }
}

#[async_trait]
impl PageStore for SqliteStore {
    async fn upsert_page(&self, page: &ListingPage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listing_pages
                (source, external_id, url, content_type, content, fetched_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (source, external_id) DO UPDATE SET
                url = excluded.url,
                content_type = excluded.content_type,
                content = excluded.content,
                fetched_at = excluded.fetched_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(page.key.source.as_str())
        .bind(&page.key.external_id)
        .bind(&page.url)
        .bind(page.kind.as_str())
        .bind(&page.content)
        .bind(page.fetched_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn get_page(&self, key: &ListingKey) -> Result<Option<ListingPage>> {
        let row: Option<PageRow> = sqlx::query_as(
            "SELECT source, external_id, url, content_type, content, fetched_at \
             FROM listing_pages WHERE source = ? AND external_id = ?",
        )
        .bind(key.source.as_str())
        .bind(&key.external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(PageRow::into_page).transpose()
    }

    async fn list_pages(&self, source: Option<Source>) -> Result<Vec<ListingPage>> {
        let rows: Vec<PageRow> = match source {
            Some(source) => sqlx::query_as(
                "SELECT source, external_id, url, content_type, content, fetched_at \
                 FROM listing_pages WHERE source = ? ORDER BY created_at DESC",
            )
            .bind(source.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?,
            None => sqlx::query_as(
                "SELECT source, external_id, url, content_type, content, fetched_at \
                 FROM listing_pages ORDER BY created_at DESC",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?,
        };

        rows.into_iter().map(PageRow::into_page).collect()
    }
}

const LISTING_COLUMNS: &str = "source, external_id, url, address, price_eur, price_warm_eur, \
     rooms, description, details, extract_error, risk_score, risk_flags, risk_reasoning, \
     risk_error, travel_times, nearby, description_en, narrative, value_score, enrich_error, \
     notified, notify_error, created_at";

#[async_trait]
impl ListingStore for SqliteStore {
    async fn upsert_listing(&self, listing: &Listing) -> Result<()> {
        let risk_flags = serde_json::to_string(&listing.risk_flags)?;
        let travel_times = serde_json::to_string(&listing.travel_times)?;
        let nearby = serde_json::to_string(&listing.nearby)?;

        sqlx::query(
            r#"
            INSERT INTO listings
                (source, external_id, url, address, price_eur, price_warm_eur, rooms,
                 description, details, extract_error, risk_score, risk_flags, risk_reasoning,
                 risk_error, travel_times, nearby, description_en, narrative, value_score,
                 enrich_error, notified, notify_error, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (source, external_id) DO UPDATE SET
                url = excluded.url,
                address = excluded.address,
                price_eur = excluded.price_eur,
                price_warm_eur = excluded.price_warm_eur,
                rooms = excluded.rooms,
                description = excluded.description,
                details = excluded.details,
                extract_error = excluded.extract_error,
                risk_score = excluded.risk_score,
                risk_flags = excluded.risk_flags,
                risk_reasoning = excluded.risk_reasoning,
                risk_error = excluded.risk_error,
                travel_times = excluded.travel_times,
                nearby = excluded.nearby,
                description_en = excluded.description_en,
                narrative = excluded.narrative,
                value_score = excluded.value_score,
                enrich_error = excluded.enrich_error,
                notified = excluded.notified,
                notify_error = excluded.notify_error,
                created_at = excluded.created_at
            "#,
        )
        .bind(listing.key.source.as_str())
        .bind(&listing.key.external_id)
        .bind(&listing.url)
        .bind(&listing.address)
        .bind(listing.price_eur)
        .bind(listing.price_warm_eur)
        .bind(listing.rooms)
        .bind(&listing.description)
        .bind(&listing.details)
        .bind(&listing.extract_error)
        .bind(listing.risk_score)
        .bind(risk_flags)
        .bind(&listing.risk_reasoning)
        .bind(&listing.risk_error)
        .bind(travel_times)
        .bind(nearby)
        .bind(&listing.description_en)
        .bind(&listing.narrative)
        .bind(listing.value_score)
        .bind(&listing.enrich_error)
        .bind(listing.notified)
        .bind(&listing.notify_error)
        .bind(listing.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn get_listing(&self, key: &ListingKey) -> Result<Option<Listing>> {
        let row: Option<ListingRow> = sqlx::query_as(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE source = ? AND external_id = ?"
        ))
        .bind(key.source.as_str())
        .bind(&key.external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(ListingRow::into_listing).transpose()
    }

    async fn list_listings(&self, source: Option<Source>) -> Result<Vec<Listing>> {
        let rows: Vec<ListingRow> = match source {
            Some(source) => sqlx::query_as(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings WHERE source = ? \
                 ORDER BY created_at DESC"
            ))
            .bind(source.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?,
            None => sqlx::query_as(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?,
        };

        rows.into_iter().map(ListingRow::into_listing).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::ContentKind;
    use crate::types::record::{ListingRecord, TravelEstimate, TravelMode};

    fn key(id: &str) -> ListingKey {
        ListingKey::new(Source::Immobilienscout24, id)
    }

    fn listing(id: &str) -> Listing {
        let page = ListingPage::new(
            key(id),
            format!("https://www.immobilienscout24.de/expose/{id}"),
            ContentKind::Text,
            "content",
        );
        ListingRecord::new(page).to_listing()
    }

    #[tokio::test]
    async fn test_page_upsert_law() {
        let store = SqliteStore::in_memory().await.unwrap();

        let first = ListingPage::new(key("1"), "https://a", ContentKind::Html, "first");
        let second = ListingPage::new(key("1"), "https://a", ContentKind::Text, "second");

        store.upsert_page(&first).await.unwrap();
        store.upsert_page(&second).await.unwrap();

        let all = store.list_pages(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "second");
        assert_eq!(all[0].kind, ContentKind::Text);
    }

    #[tokio::test]
    async fn test_listing_round_trip_with_json_fields() {
        let store = SqliteStore::in_memory().await.unwrap();

        let mut listing = listing("7");
        listing.risk_flags = vec!["price_too_low".to_string()];
        listing.travel_times = vec![TravelTime {
            destination: "Bremen Hbf".to_string(),
            mode: TravelMode::Walking,
            estimate: TravelEstimate {
                minutes: 12.0,
                km: 0.9,
            },
        }];
        listing.notified = true;

        store.upsert_listing(&listing).await.unwrap();

        let stored = store.get_listing(&key("7")).await.unwrap().unwrap();
        assert_eq!(stored.risk_flags, vec!["price_too_low"]);
        assert_eq!(stored.travel_times.len(), 1);
        assert_eq!(stored.travel_times[0].mode, TravelMode::Walking);
        assert!(stored.notified);
    }

    #[tokio::test]
    async fn test_link_city_filter() {
        let store = SqliteStore::in_memory().await.unwrap();

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
        assert_eq!(bremen[0].key.external_id, "1");
    }

    #[tokio::test]
    async fn test_source_filter_on_listings() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert_listing(&listing("1")).await.unwrap();

        let scout = store
            .list_listings(Some(Source::Immobilienscout24))
            .await
            .unwrap();
        assert_eq!(scout.len(), 1);

        let klein = store
            .list_listings(Some(Source::Kleinanzeigen))
            .await
            .unwrap();
        assert!(klein.is_empty());
    }
}
