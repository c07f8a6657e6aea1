//! Acquisition: fetch listing pages with bounded concurrency.
//!
//! Each discovered link is fetched independently; one failure never
//! aborts the batch. The result maps every input identity to either its
//! page or its fetch error, so callers can tell "failed" from "never
//! attempted". Cancellation stops new fetches; already-completed results
//! are kept.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{FetchError, Result};
use crate::scrape::content::apply_content_mode;
use crate::traits::fetcher::Fetcher;
use crate::traits::store::PageStore;
use crate::types::config::AcquireConfig;
use crate::types::listing::{DiscoveredLink, ListingKey, ListingPage};

/// Per-link acquisition outcome.
pub type FetchOutcome = std::result::Result<ListingPage, FetchError>;

/// Fetch all links with at most `config.max_concurrent` in flight.
///
/// The returned map has one entry per distinct input identity. The
/// configured content mode is applied uniformly to every fetched page.
pub async fn acquire(
    fetcher: &dyn Fetcher,
    links: &[DiscoveredLink],
    config: &AcquireConfig,
) -> HashMap<ListingKey, FetchOutcome> {
    acquire_cancellable(fetcher, links, config, &CancellationToken::new()).await
}

/// Like [`acquire`], but stops starting new fetches once `cancel` fires.
///
/// Identities whose fetch never started are absent from the result map.
pub async fn acquire_cancellable(
    fetcher: &dyn Fetcher,
    links: &[DiscoveredLink],
    config: &AcquireConfig,
    cancel: &CancellationToken,
) -> HashMap<ListingKey, FetchOutcome> {
    let mut results: HashMap<ListingKey, FetchOutcome> = HashMap::new();

    // Duplicate identities in the input collapse to one fetch.
    let mut seen = std::collections::HashSet::new();
    let unique: Vec<&DiscoveredLink> = links
        .iter()
        .filter(|link| seen.insert(link.key.clone()))
        .collect();

    let mut fetches = stream::iter(unique)
        .map(|link| {
        let key = link.key.clone();
        let url = link.url.clone();
        async move {
            let outcome = match fetcher.fetch(&url).await {
                Ok(html) => {
                    let (kind, content) =
                        apply_content_mode(&html, key.source, config.content_mode);
                    if content.trim().is_empty() {
                        Err(FetchError::EmptyContent { url: url.clone() })
                    } else {
                        Ok(ListingPage::new(key.clone(), url, kind, content))
                    }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "listing page fetch failed");
                    Err(e)
                }
            };
            (key, outcome)
        }
    })
    .buffer_unordered(config.max_concurrent);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(completed = results.len(), total = links.len(),
                    "acquisition cancelled");
                break;
            }
            next = fetches.next() => match next {
                Some((key, outcome)) => {
                    results.insert(key, outcome);
                }
                None => break,
            },
        }
    }
    drop(fetches);

    let failed = results.values().filter(|r| r.is_err()).count();
    info!(
        fetched = results.len() - failed,
        failed,
        total = links.len(),
        "acquisition done"
    );
    results
}

/// Counts from one acquire-and-persist run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquireReport {
    /// Pages fetched and stored
    pub stored: usize,

    /// Links whose fetch failed
    pub failed: usize,
}

/// Fetch all links and upsert successful pages into the page store.
///
/// Fetch failures are logged and counted, never propagated; a storage
/// failure aborts the run.
pub async fn acquire_into_store<S: PageStore + ?Sized>(
    fetcher: &dyn Fetcher,
    store: &S,
    links: &[DiscoveredLink],
    config: &AcquireConfig,
) -> Result<AcquireReport> {
    let outcomes = acquire(fetcher, links, config).await;

    let mut report = AcquireReport::default();
    for outcome in outcomes.values() {
        match outcome {
            Ok(page) => {
                store.upsert_page(page).await?;
                report.stored += 1;
            }
            Err(_) => report.failed += 1,
        }
    }

    info!(stored = report.stored, failed = report.failed, "acquisition persisted");
    Ok(report)
}
