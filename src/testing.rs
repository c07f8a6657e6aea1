//! Deterministic test doubles for the capability traits.
//!
//! Hand-rolled mocks with call tracking; used by the unit tests here and
//! by the integration tests. Builders configure canned outputs and
//! injected failures per capability.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{AiError, AiResult, FetchError, FetchResult, GeoError, GeoResult, NotifyError, NotifyResult};
use crate::traits::ai::ListingAi;
use crate::traits::fetcher::Fetcher;
use crate::traits::maps::MapsClient;
use crate::traits::notifier::Notifier;
use crate::types::config::Destination;
use crate::types::listing::ListingPage;
use crate::types::record::{
    Coordinates, EnrichedText, ExtractedListing, NearbyPlace, RiskAssessment, TravelEstimate,
    TravelMode,
};

/// In-memory fetcher serving canned pages, with a call log.
///
/// URLs not configured via [`with_page`](Self::with_page) or
/// [`with_failure`](Self::with_failure) return a 404-style error.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `url`.
    pub fn with_page(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.pages.insert(url.into(), content.into());
        self
    }

    /// Fail fetches of `url` with an injected error.
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failures
            .insert(url.into(), "injected failure".to_string());
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.calls.lock().unwrap().push(url.to_string());

        if let Some(message) = self.failures.get(url) {
            return Err(FetchError::Api(message.clone()));
        }
        match self.pages.get(url) {
            Some(content) => Ok(content.clone()),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Canned [`ListingAi`] with per-capability failure injection and call
/// counters.
pub struct MockAi {
    extracted: ExtractedListing,
    risk: RiskAssessment,
    enriched: EnrichedText,
    fail_extract: bool,
    fail_risk: bool,
    fail_enrich: bool,
    extract_count: AtomicUsize,
    risk_count: AtomicUsize,
    enrich_count: AtomicUsize,
}

impl Default for MockAi {
    fn default() -> Self {
        Self {
            extracted: ExtractedListing {
                address: Some("Findorffstraße 1, 28215 Bremen".to_string()),
                price_eur: Some(550.0),
                price_warm_eur: Some(700.0),
                rooms: Some(2.0),
                description: Some("Helle 2-Zimmer-Wohnung in Findorff".to_string()),
                details: Some("55 m², Einbauküche, ab sofort".to_string()),
            },
            risk: RiskAssessment {
                score: 0.9,
                flags: vec![],
                reasoning: "consistent pricing, full address given".to_string(),
            },
            enriched: EnrichedText {
                description_en: "Bright 2-room flat in Findorff".to_string(),
                narrative: "Quiet street close to the Bürgerpark.".to_string(),
                value_score: 0.7,
            },
            fail_extract: false,
            fail_risk: false,
            fail_enrich: false,
            extract_count: AtomicUsize::new(0),
            risk_count: AtomicUsize::new(0),
            enrich_count: AtomicUsize::new(0),
        }
    }
}

impl MockAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extracted(mut self, extracted: ExtractedListing) -> Self {
        self.extracted = extracted;
        self
    }

    pub fn with_risk(mut self, risk: RiskAssessment) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_enriched(mut self, enriched: EnrichedText) -> Self {
        self.enriched = enriched;
        self
    }

    pub fn failing_extract(mut self) -> Self {
        self.fail_extract = true;
        self
    }

    pub fn failing_risk(mut self) -> Self {
        self.fail_risk = true;
        self
    }

    pub fn failing_enrich(mut self) -> Self {
        self.fail_enrich = true;
        self
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_count.load(Ordering::SeqCst)
    }

    pub fn risk_calls(&self) -> usize {
        self.risk_count.load(Ordering::SeqCst)
    }

    pub fn enrich_calls(&self) -> usize {
        self.enrich_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingAi for MockAi {
    async fn extract_listing(&self, _page: &ListingPage) -> AiResult<ExtractedListing> {
        self.extract_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_extract {
            return Err(AiError::MalformedOutput("injected failure".to_string()));
        }
        Ok(self.extracted.clone())
    }

    async fn assess_risk(&self, _listing: &ExtractedListing) -> AiResult<RiskAssessment> {
        self.risk_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_risk {
            return Err(AiError::Timeout);
        }
        Ok(self.risk.clone())
    }

    async fn enrich_listing(
        &self,
        _listing: &ExtractedListing,
        _travel_times: &[crate::types::record::TravelTime],
    ) -> AiResult<EnrichedText> {
        self.enrich_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_enrich {
            return Err(AiError::Api("injected failure".to_string()));
        }
        Ok(self.enriched.clone())
    }
}

/// Canned [`MapsClient`] with per-capability failure injection.
pub struct MockMaps {
    coordinates: Option<Coordinates>,
    estimate: TravelEstimate,
    places: Vec<NearbyPlace>,
    fail_geocode: bool,
    fail_travel: bool,
    fail_places: bool,
}

impl Default for MockMaps {
    fn default() -> Self {
        Self {
            // Bremen city center
            coordinates: Some(Coordinates {
                lat: 53.0793,
                lng: 8.8017,
            }),
            estimate: TravelEstimate {
                minutes: 15.0,
                km: 3.0,
            },
            places: vec![NearbyPlace {
                name: "Bürgerpark".to_string(),
                categories: vec!["park".to_string()],
                vicinity: "Bürgerpark, 28209 Bremen".to_string(),
            }],
            fail_geocode: false,
            fail_travel: false,
            fail_places: false,
        }
    }
}

impl MockMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the geocoding result (`None` for "address not found").
    pub fn with_coordinates(mut self, coordinates: Option<Coordinates>) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_estimate(mut self, estimate: TravelEstimate) -> Self {
        self.estimate = estimate;
        self
    }

    pub fn with_places(mut self, places: Vec<NearbyPlace>) -> Self {
        self.places = places;
        self
    }

    pub fn failing_geocode(mut self) -> Self {
        self.fail_geocode = true;
        self
    }

    pub fn failing_travel(mut self) -> Self {
        self.fail_travel = true;
        self
    }

    pub fn failing_places(mut self) -> Self {
        self.fail_places = true;
        self
    }
}

#[async_trait]
impl MapsClient for MockMaps {
    async fn geocode(&self, _address: &str) -> GeoResult<Option<Coordinates>> {
        if self.fail_geocode {
            return Err(GeoError::Api("injected failure".to_string()));
        }
        Ok(self.coordinates)
    }

    async fn travel_times(
        &self,
        _origin: &str,
        destinations: &[Destination],
        _mode: TravelMode,
    ) -> GeoResult<Vec<Option<TravelEstimate>>> {
        if self.fail_travel {
            return Err(GeoError::Api("injected failure".to_string()));
        }
        Ok(destinations.iter().map(|_| Some(self.estimate)).collect())
    }

    async fn places_nearby(
        &self,
        _center: Coordinates,
        _radius_m: u32,
    ) -> GeoResult<Vec<NearbyPlace>> {
        if self.fail_places {
            return Err(GeoError::Api("injected failure".to_string()));
        }
        Ok(self.places.clone())
    }
}

/// Recording [`Notifier`] with optional failure injection.
#[derive(Default)]
pub struct MockNotifier {
    fail: bool,
    sends: Mutex<Vec<(String, String)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            sends: Mutex::new(Vec::new()),
        }
    }

    /// `(summary, detail)` pairs sent so far.
    pub fn sends(&self) -> Vec<(String, String)> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, summary: &str, detail: &str) -> NotifyResult<()> {
        if self.fail {
            return Err(NotifyError::Rejected("injected failure".to_string()));
        }
        self.sends
            .lock()
            .unwrap()
            .push((summary.to_string(), detail.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
