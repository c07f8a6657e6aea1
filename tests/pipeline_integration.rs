//! End-to-end tests: discovery → acquisition → enrichment → persistence.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use flatwatch::pipeline::{
    acquire, acquire_into_store, discover, discover_into_store, Pipeline,
};
use flatwatch::stores::{MemoryStore, SqliteStore};
use flatwatch::testing::{MockAi, MockFetcher, MockMaps, MockNotifier};
use flatwatch::types::config::{
    default_sites, AcquireConfig, DiscoverConfig, SiteProfile,
};
use flatwatch::{LinkStore, ListingKey, ListingPage, ListingStore, PageStore, Source};

fn scout() -> SiteProfile {
    default_sites()[0].clone()
}

fn kleinanzeigen() -> SiteProfile {
    default_sites()[1].clone()
}

const SCOUT_SEARCH: &str = "https://www.immobilienscout24.de/Suche/de/bremen/wohnung-mieten";
const KA_SEARCH: &str = "https://www.kleinanzeigen.de/s-wohnung-mieten/bremen/k0c203";

fn listing_html(description: &str) -> String {
    format!("<html><body><main><h1>Mietwohnung</h1><p>{description}</p></main></body></html>")
}

/// Happy path: two portals, two listings each, all stages succeed, the
/// notifier fires once per listing.
#[tokio::test]
async fn full_run_produces_notified_listings() {
    let fetcher = MockFetcher::new()
        .with_page(
            SCOUT_SEARCH,
            r#"<a href="/expose/101">a</a> <a href="/expose/102">b</a>"#,
        )
        .with_page(
            KA_SEARCH,
            r#"<a href="/s-anzeige/zwei-zimmer/201">c</a>"#,
        )
        .with_page(
            "https://www.immobilienscout24.de/expose/101",
            listing_html("2 Zimmer, 550 kalt, Findorff"),
        )
        .with_page(
            "https://www.immobilienscout24.de/expose/102",
            listing_html("3 Zimmer, 800 kalt, Schwachhausen"),
        )
        .with_page(
            "https://www.kleinanzeigen.de/s-anzeige/zwei-zimmer/201",
            listing_html("2 Zimmer, 600 warm, Walle"),
        );

    let links = discover(
        &fetcher,
        &[scout(), kleinanzeigen()],
        "Bremen",
        &DiscoverConfig::new(),
    )
    .await
    .unwrap();
    assert_eq!(links.len(), 3);

    let outcomes = acquire(&fetcher, &links, &AcquireConfig::new()).await;
    assert_eq!(outcomes.len(), 3);
    let pages: Vec<ListingPage> = outcomes.into_values().flatten().collect();
    assert_eq!(pages.len(), 3);

    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MockNotifier::new());
    let pipeline = Pipeline::new(
        Arc::clone(&store),
        Arc::new(MockAi::new()),
        Arc::new(MockMaps::new()),
    )
    .with_notifier(notifier.clone());

    let listings = pipeline
        .run_batch(pages, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(listings.len(), 3);
    for listing in &listings {
        assert!(listing.notified);
        assert!(!listing.has_errors());
        assert!(listing.risk_score.is_some());
        assert!(!listing.travel_times.is_empty());
    }
    assert_eq!(store.listing_count(), 3);
    assert_eq!(notifier.sends().len(), 3);
}

/// Partial failure: one page fetch fails, one extraction fails. The
/// remaining listing completes fully; every attempted identity ends up
/// in the result store.
#[tokio::test]
async fn failures_stay_isolated_per_listing() {
    let fetcher = MockFetcher::new()
        .with_page(
            SCOUT_SEARCH,
            r#"
                <a href="/expose/1">a</a>
                <a href="/expose/2">b</a>
                <a href="/expose/3">c</a>
            "#,
        )
        .with_page(
            "https://www.immobilienscout24.de/expose/1",
            listing_html("gute Wohnung"),
        )
        .with_failure("https://www.immobilienscout24.de/expose/2")
        .with_page(
            "https://www.immobilienscout24.de/expose/3",
            listing_html("noch eine Wohnung"),
        );

    let links = discover(&fetcher, &[scout()], "Bremen", &DiscoverConfig::new())
        .await
        .unwrap();
    let outcomes = acquire(&fetcher, &links, &AcquireConfig::new()).await;

    // Failed fetch is present as an explicit marker, not silently absent.
    let failed_key = ListingKey::new(Source::Immobilienscout24, "2");
    assert!(outcomes[&failed_key].is_err());

    let pages: Vec<ListingPage> = outcomes.into_values().flatten().collect();
    assert_eq!(pages.len(), 2);

    // Extraction fails for every page in this pipeline.
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(
        Arc::clone(&store),
        Arc::new(MockAi::new().failing_extract()),
        Arc::new(MockMaps::new()),
    );
    let listings = pipeline
        .run_batch(pages, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(listings.len(), 2);
    for listing in &listings {
        assert!(listing.extract_error.is_some());
        assert!(listing.risk_score.is_none());
        assert!(!listing.notified);
    }
    // Failed extractions are still persisted, with their error markers.
    assert_eq!(store.listing_count(), 2);
}

/// Re-running discovery and the pipeline for unchanged search results is
/// idempotent: no duplicate rows, later runs overwrite by identity.
#[tokio::test]
async fn reruns_overwrite_instead_of_duplicating() {
    let fetcher = MockFetcher::new()
        .with_page(SCOUT_SEARCH, r#"<a href="/expose/7">x</a>"#)
        .with_page(
            "https://www.immobilienscout24.de/expose/7",
            listing_html("Wohnung Nummer sieben"),
        );

    let store = Arc::new(MemoryStore::new());

    let first = discover_into_store(
        &fetcher,
        store.as_ref(),
        &[scout()],
        "Bremen",
        &DiscoverConfig::new(),
    )
    .await
    .unwrap();
    assert_eq!((first.found, first.new), (1, 1));

    let second = discover_into_store(
        &fetcher,
        store.as_ref(),
        &[scout()],
        "Bremen",
        &DiscoverConfig::new(),
    )
    .await
    .unwrap();
    assert_eq!((second.found, second.new), (1, 0));

    let links = store.list_links(Some("Bremen")).await.unwrap();
    assert_eq!(links.len(), 1);

    let report = acquire_into_store(&fetcher, store.as_ref(), &links, &AcquireConfig::new())
        .await
        .unwrap();
    assert_eq!(report.stored, 1);

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        Arc::new(MockAi::new()),
        Arc::new(MockMaps::new()),
    );
    let pages = store.list_pages(None).await.unwrap();
    pipeline
        .run_batch(pages.clone(), &CancellationToken::new())
        .await
        .unwrap();
    pipeline
        .run_batch(pages, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(store.listing_count(), 1);
}

/// Two discovery runs with overlapping results: the link store ends up
/// with the union of identities, and overlapping entries carry the URL
/// from the later run.
#[tokio::test]
async fn overlapping_discovery_runs_union() {
    let store = Arc::new(MemoryStore::new());

    let first = MockFetcher::new().with_page(
        SCOUT_SEARCH,
        r#"<a href="/expose/1">a</a> <a href="/expose/2">b</a>"#,
    );
    discover_into_store(
        &first,
        store.as_ref(),
        &[scout()],
        "Bremen",
        &DiscoverConfig::new(),
    )
    .await
    .unwrap();

    // Listing 2 reappears under a redirect-style URL, listing 3 is new.
    let second = MockFetcher::new().with_page(
        SCOUT_SEARCH,
        r#"<a href="/neu/expose/2">b</a> <a href="/expose/3">c</a>"#,
    );
    let report = discover_into_store(
        &second,
        store.as_ref(),
        &[scout()],
        "Bremen",
        &DiscoverConfig::new(),
    )
    .await
    .unwrap();
    assert_eq!((report.found, report.new), (2, 1));

    let links = store.list_links(None).await.unwrap();
    assert_eq!(links.len(), 3);

    let overlapping = store
        .get_link(&ListingKey::new(Source::Immobilienscout24, "2"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        overlapping.url,
        "https://www.immobilienscout24.de/neu/expose/2"
    );
}

/// Without a notifier the notify stage is a silent no-op: not notified,
/// no notify error.
#[tokio::test]
async fn missing_notifier_is_a_clean_noop() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(
        Arc::clone(&store),
        Arc::new(MockAi::new()),
        Arc::new(MockMaps::new()),
    );

    let page = ListingPage::new(
        ListingKey::new(Source::Kleinanzeigen, "9"),
        "https://www.kleinanzeigen.de/s-anzeige/x/9",
        flatwatch::types::listing::ContentKind::Text,
        "3 Zimmer, 900 warm",
    );
    let listing = pipeline.run(page).await.unwrap();

    assert!(!listing.notified);
    assert!(listing.notify_error.is_none());
    assert!(!listing.has_errors());
}

/// The same flow against the real SQLite store (in-memory database):
/// rows survive the trip through sqlx, reruns upsert by identity.
#[tokio::test]
async fn sqlite_store_end_to_end() {
    let fetcher = MockFetcher::new()
        .with_page(SCOUT_SEARCH, r#"<a href="/expose/42">x</a>"#)
        .with_page(
            "https://www.immobilienscout24.de/expose/42",
            listing_html("Wohnung 42"),
        );

    let store = Arc::new(SqliteStore::in_memory().await.unwrap());

    discover_into_store(
        &fetcher,
        store.as_ref(),
        &[scout()],
        "Bremen",
        &DiscoverConfig::new(),
    )
    .await
    .unwrap();
    let links = store.list_links(None).await.unwrap();
    acquire_into_store(&fetcher, store.as_ref(), &links, &AcquireConfig::new())
        .await
        .unwrap();

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        Arc::new(MockAi::new()),
        Arc::new(MockMaps::new()),
    );
    let pages = store.list_pages(Some(Source::Immobilienscout24)).await.unwrap();
    assert_eq!(pages.len(), 1);

    pipeline
        .run_batch(pages.clone(), &CancellationToken::new())
        .await
        .unwrap();
    pipeline
        .run_batch(pages, &CancellationToken::new())
        .await
        .unwrap();

    let key = ListingKey::new(Source::Immobilienscout24, "42");
    let stored = store.get_listing(&key).await.unwrap().unwrap();
    assert_eq!(stored.key, key);
    assert!(stored.price_eur.is_some());
    assert!(!stored.travel_times.is_empty());

    let all = store.list_listings(None).await.unwrap();
    assert_eq!(all.len(), 1);
}

/// Cancellation mid-batch: nothing after the cancel point is persisted.
#[tokio::test]
async fn cancelled_batch_stops_cleanly() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(
        Arc::clone(&store),
        Arc::new(MockAi::new()),
        Arc::new(MockMaps::new()),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let page = ListingPage::new(
        ListingKey::new(Source::Kleinanzeigen, "1"),
        "https://www.kleinanzeigen.de/s-anzeige/x/1",
        flatwatch::types::listing::ContentKind::Text,
        "egal",
    );
    let result = pipeline.run_batch(vec![page], &cancel).await;
    assert!(result.is_err());
    assert_eq!(store.listing_count(), 0);
}
