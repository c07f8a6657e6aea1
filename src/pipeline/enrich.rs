//! The enrichment state machine.
//!
//! A [`Pipeline`] runs one listing page through the fixed stage order
//! `Extract → RiskScore → Enrich → Notify → Done`. Extraction failure is
//! the only hard stop; risk, enrich, and notify failures are recorded on
//! the record and never abort the run. The terminal [`Listing`] row is
//! persisted exactly once, after the last stage, whether or not stages
//! failed. Only a storage failure or cancellation makes `run` return an
//! error.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::notify::{build_detail, build_summary};
use crate::traits::ai::ListingAi;
use crate::traits::maps::MapsClient;
use crate::traits::notifier::Notifier;
use crate::traits::store::Store;
use crate::types::config::EnrichConfig;
use crate::types::listing::ListingPage;
use crate::types::record::{Listing, ListingRecord, Stage, TravelMode, TravelTime};

/// Upper bound on listings enriched concurrently by
/// [`Pipeline::run_batch`].
const BATCH_CONCURRENCY: usize = 4;

/// The per-listing enrichment pipeline.
///
/// Generic over its storage, AI, and maps capabilities; the notifier is
/// optional and decided once at construction. Cheap to clone via the
/// inner `Arc`s.
pub struct Pipeline<S, A, M> {
    store: Arc<S>,
    ai: Arc<A>,
    maps: Arc<M>,
    notifier: Option<Arc<dyn Notifier>>,
    config: EnrichConfig,
}

impl<S, A, M> Clone for Pipeline<S, A, M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ai: Arc::clone(&self.ai),
            maps: Arc::clone(&self.maps),
            notifier: self.notifier.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, A, M> Pipeline<S, A, M>
where
    S: Store,
    A: ListingAi,
    M: MapsClient,
{
    /// Create a pipeline without a notifier (the notify stage no-ops).
    pub fn new(store: Arc<S>, ai: Arc<A>, maps: Arc<M>) -> Self {
        Self {
            store,
            ai,
            maps,
            notifier: None,
            config: EnrichConfig::default(),
        }
    }

    /// Attach a notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Replace the enrich-stage configuration.
    pub fn with_config(mut self, config: EnrichConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one page through all stages and persist the result.
    pub async fn run(&self, page: ListingPage) -> Result<Listing> {
        self.run_cancellable(page, &CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), but aborts between stages when `cancel`
    /// fires. A cancelled run persists nothing.
    pub async fn run_cancellable(
        &self,
        page: ListingPage,
        cancel: &CancellationToken,
    ) -> Result<Listing> {
        let key = page.key.clone();
        let mut record = ListingRecord::new(page);

        loop {
            if cancel.is_cancelled() {
                warn!(key = %key, stage = ?record.stage, "pipeline run cancelled");
                return Err(PipelineError::Cancelled);
            }

            debug!(key = %key, stage = ?record.stage, "entering stage");
            record = match record.stage {
                Stage::Extract => self.step_extract(record).await,
                Stage::RiskScore => self.step_risk(record).await,
                Stage::Enrich => self.step_enrich(record).await,
                Stage::Notify => self.step_notify(record).await,
                Stage::Done => break,
            };
        }

        let listing = record.to_listing();
        self.store.upsert_listing(&listing).await?;

        info!(
            key = %key,
            extracted = record.extract_succeeded(),
            risk_score = ?listing.risk_score,
            notified = listing.notified,
            has_errors = listing.has_errors(),
            "pipeline run done"
        );
        Ok(listing)
    }

    /// Run a batch of pages, several listings in flight at once.
    ///
    /// Per-listing stage failures never abort the batch; only a storage
    /// failure or cancellation stops it. Results arrive in completion
    /// order, not input order.
    pub async fn run_batch(
        &self,
        pages: Vec<ListingPage>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Listing>> {
        stream::iter(pages)
            .map(|page| self.run_cancellable(page, cancel))
            .buffer_unordered(BATCH_CONCURRENCY)
            .try_collect()
            .await
    }

    /// Extract structured fields. The only hard stop: on failure the
    /// record jumps straight to `Done` with nothing else attempted.
    async fn step_extract(&self, mut record: ListingRecord) -> ListingRecord {
        match self.ai.extract_listing(&record.page).await {
            Ok(extracted) => {
                record.extracted = Some(extracted);
                record.stage = Stage::RiskScore;
            }
            Err(e) => {
                warn!(key = %record.key(), error = %e, "extraction failed, skipping downstream stages");
                record.extract_error = Some(e.to_string());
                record.stage = Stage::Done;
            }
        }
        record
    }

    async fn step_risk(&self, mut record: ListingRecord) -> ListingRecord {
        // Reachable only after a successful extract.
        if let Some(extracted) = record.extracted.clone() {
            match self.ai.assess_risk(&extracted).await {
                Ok(risk) => record.risk = Some(risk),
                Err(e) => {
                    warn!(key = %record.key(), error = %e, "risk assessment failed");
                    record.risk_error = Some(e.to_string());
                }
            }
        }
        record.stage = Stage::Enrich;
        record
    }

    /// Geocode, travel times, nearby places, and LLM enrichment. Each
    /// sub-step degrades independently; partial results are kept and the
    /// error messages are joined into one stage error.
    async fn step_enrich(&self, mut record: ListingRecord) -> ListingRecord {
        let extracted = record.extracted.clone().unwrap_or_default();
        let origin = match extracted.address.clone() {
            Some(address) => address,
            None => {
                debug!(key = %record.key(), "no address, using fallback origin");
                self.config.fallback_origin.clone()
            }
        };
        let mut errors: Vec<String> = Vec::new();

        match self.maps.geocode(&origin).await {
            Ok(Some(coordinates)) => record.coordinates = Some(coordinates),
            // Not an error: coordinates and nearby places are omitted.
            Ok(None) => {
                debug!(key = %record.key(), origin = %origin, "no geocoding result")
            }
            Err(e) => errors.push(format!("geocoding: {e}")),
        }

        for mode in [TravelMode::Walking, TravelMode::Transit] {
            match self
                .maps
                .travel_times(&origin, &self.config.destinations, mode)
                .await
            {
                Ok(estimates) => {
                    for (destination, estimate) in
                        self.config.destinations.iter().zip(estimates)
                    {
                        if let Some(estimate) = estimate {
                            record.travel_times.push(TravelTime {
                                destination: destination.label.clone(),
                                mode,
                                estimate,
                            });
                        }
                    }
                }
                Err(e) => errors.push(format!("travel times ({mode}): {e}")),
            }
        }

        if let Some(coordinates) = record.coordinates {
            match self
                .maps
                .places_nearby(coordinates, self.config.nearby_radius_m)
                .await
            {
                Ok(places) => record.nearby = places,
                Err(e) => errors.push(format!("nearby places: {e}")),
            }
        }

        match self
            .ai
            .enrich_listing(&extracted, &record.travel_times)
            .await
        {
            Ok(enriched) => record.enriched = Some(enriched),
            Err(e) => errors.push(format!("enrichment: {e}")),
        }

        if !errors.is_empty() {
            warn!(key = %record.key(), errors = errors.len(), "enrich stage degraded");
            record.enrich_error = Some(errors.join("; "));
        }
        record.stage = Stage::Notify;
        record
    }

    /// Dispatch the finished record. Without a notifier this is a
    /// deliberate no-op: no send, no error.
    async fn step_notify(&self, mut record: ListingRecord) -> ListingRecord {
        if let Some(notifier) = &self.notifier {
            let summary = build_summary(&record);
            let detail = build_detail(&record);
            match notifier.send(&summary, &detail).await {
                Ok(()) => record.notified = true,
                Err(e) => {
                    warn!(key = %record.key(), notifier = notifier.name(), error = %e,
                        "notification failed");
                    record.notify_error = Some(e.to_string());
                }
            }
        } else {
            debug!(key = %record.key(), "no notifier configured, skipping dispatch");
        }
        record.stage = Stage::Done;
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::{MockAi, MockMaps, MockNotifier};
    use crate::types::listing::{ContentKind, ListingKey, Source};

    fn page(id: &str) -> ListingPage {
        ListingPage::new(
            ListingKey::new(Source::Kleinanzeigen, id),
            format!("https://www.kleinanzeigen.de/s-anzeige/x/{id}"),
            ContentKind::Text,
            "2 Zimmer, 500 EUR kalt, Bremen Findorff",
        )
    }

    fn pipeline(
        ai: MockAi,
        maps: MockMaps,
    ) -> (Pipeline<MemoryStore, MockAi, MockMaps>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(Arc::clone(&store), Arc::new(ai), Arc::new(maps));
        (pipeline, store)
    }

    #[tokio::test]
    async fn test_happy_path_persists_full_listing() {
        let (pipeline, store) = pipeline(MockAi::new(), MockMaps::new());

        let listing = pipeline.run(page("1")).await.unwrap();
        assert!(listing.price_eur.is_some());
        assert!(listing.risk_score.is_some());
        assert!(!listing.travel_times.is_empty());
        assert!(!listing.has_errors());
        assert!(!listing.notified);
        assert_eq!(store.listing_count(), 1);
    }

    #[tokio::test]
    async fn test_extract_failure_hard_stops_but_persists() {
        let ai = MockAi::new().failing_extract();
        let (pipeline, store) = pipeline(ai, MockMaps::new());

        let listing = pipeline.run(page("2")).await.unwrap();
        assert!(listing.extract_error.is_some());
        assert!(listing.risk_score.is_none());
        assert!(listing.travel_times.is_empty());
        assert_eq!(store.listing_count(), 1);

        // Downstream AI capabilities must not have been invoked.
        let ai = pipeline.ai.clone();
        assert_eq!(ai.risk_calls(), 0);
        assert_eq!(ai.enrich_calls(), 0);
    }

    #[tokio::test]
    async fn test_risk_failure_is_soft() {
        let ai = MockAi::new().failing_risk();
        let (pipeline, _store) = pipeline(ai, MockMaps::new());

        let listing = pipeline.run(page("3")).await.unwrap();
        assert!(listing.risk_error.is_some());
        assert!(listing.risk_score.is_none());
        // Enrichment still ran.
        assert!(listing.narrative.is_some());
    }

    #[tokio::test]
    async fn test_geocode_failure_degrades_enrich() {
        let maps = MockMaps::new().failing_geocode();
        let (pipeline, _store) = pipeline(MockAi::new(), maps);

        let listing = pipeline.run(page("4")).await.unwrap();
        assert!(listing.enrich_error.is_some());
        // Travel times and LLM enrichment are independent of geocoding.
        assert!(!listing.travel_times.is_empty());
        assert!(listing.narrative.is_some());
        assert!(listing.nearby.is_empty());
    }

    #[tokio::test]
    async fn test_geocode_miss_is_not_an_error() {
        let maps = MockMaps::new().with_coordinates(None);
        let (pipeline, _store) = pipeline(MockAi::new(), maps);

        let listing = pipeline.run(page("10")).await.unwrap();
        assert!(listing.enrich_error.is_none());
        assert!(listing.nearby.is_empty());
        // Travel times route by address and do not need the geocode.
        assert!(!listing.travel_times.is_empty());
        assert!(listing.narrative.is_some());
    }

    #[tokio::test]
    async fn test_notifier_success_marks_notified() {
        let notifier = Arc::new(MockNotifier::new());
        let (pipeline, _store) = pipeline(MockAi::new(), MockMaps::new());
        let pipeline = pipeline.with_notifier(notifier.clone());

        let listing = pipeline.run(page("5")).await.unwrap();
        assert!(listing.notified);
        assert!(listing.notify_error.is_none());
        assert_eq!(notifier.sends().len(), 1);
    }

    #[tokio::test]
    async fn test_notifier_failure_is_soft() {
        let notifier = Arc::new(MockNotifier::failing());
        let (pipeline, store) = pipeline(MockAi::new(), MockMaps::new());
        let pipeline = pipeline.with_notifier(notifier);

        let listing = pipeline.run(page("6")).await.unwrap();
        assert!(!listing.notified);
        assert!(listing.notify_error.is_some());
        assert_eq!(store.listing_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_persists_nothing() {
        let (pipeline, store) = pipeline(MockAi::new(), MockMaps::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pipeline.run_cancellable(page("7"), &cancel).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert_eq!(store.listing_count(), 0);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_by_identity() {
        let (pipeline, store) = pipeline(MockAi::new(), MockMaps::new());

        pipeline.run(page("8")).await.unwrap();
        pipeline.run(page("8")).await.unwrap();
        assert_eq!(store.listing_count(), 1);
    }
}
