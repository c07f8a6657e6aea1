//! The pipeline record and its stage outputs.
//!
//! A [`ListingRecord`] is threaded through the enrichment state machine,
//! accumulating fields stage by stage. Each stage either adds fields or
//! records a stage-scoped error; errors are data, not control flow. The
//! terminal projection of the record is a [`Listing`], the row persisted
//! to the result store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::listing::{ListingKey, ListingPage};

/// Structured fields extracted from a listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedListing {
    /// Full address if stated (street, number, postal code, city)
    pub address: Option<String>,

    /// Monthly cold rent (Kaltmiete) in EUR
    pub price_eur: Option<f64>,

    /// Monthly warm rent (Warmmiete/Gesamtmiete) in EUR
    pub price_warm_eur: Option<f64>,

    /// Number of rooms (may be fractional, e.g. 2.5)
    pub rooms: Option<f64>,

    /// Main listing description text
    pub description: Option<String>,

    /// Short free-text summary of extra details (area, heating,
    /// availability, deposit, pets, ...)
    pub details: Option<String>,
}

/// Risk assessment output (score 0 = likely fraud, 1 = likely legit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 0.0 = likely fraud, 1.0 = likely legitimate
    pub score: f64,

    /// Short flag strings for issues found
    pub flags: Vec<String>,

    /// Brief explanation of the assessment
    pub reasoning: String,
}

/// Geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Travel mode for duration lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Walking,
    Transit,
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelMode::Walking => f.write_str("walking"),
            TravelMode::Transit => f.write_str("transit"),
        }
    }
}

/// Duration and distance estimate for one route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelEstimate {
    pub minutes: f64,
    pub km: f64,
}

/// Travel time from the listing to one configured destination by one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelTime {
    /// Destination label from [`crate::types::config::Destination`]
    pub destination: String,

    pub mode: TravelMode,

    pub estimate: TravelEstimate,
}

/// A point of interest near the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub name: String,

    /// Provider categories (e.g. "restaurant", "park")
    pub categories: Vec<String>,

    /// Short address or vicinity string
    pub vicinity: String,
}

/// LLM enrichment text output: translation, narrative, value score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedText {
    /// Listing description translated to English
    pub description_en: String,

    /// Short neighbourhood/listing narrative in English
    pub narrative: String,

    /// Value-for-money score, 0.0 to 1.0
    pub value_score: f64,
}

/// Pipeline stages in fixed order.
///
/// The enrichment pipeline is a linear state machine, not a graph:
/// `Extract → RiskScore → Enrich → Notify → Done`. Extraction failure is
/// the only hard stop (it jumps straight to `Done`); every other stage
/// records its error on the record and passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    RiskScore,
    Enrich,
    Notify,
    Done,
}

/// The per-listing record accumulated through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Input page (identity + raw content)
    pub page: ListingPage,

    /// Extract stage output
    pub extracted: Option<ExtractedListing>,
    pub extract_error: Option<String>,

    /// Risk stage output
    pub risk: Option<RiskAssessment>,
    pub risk_error: Option<String>,

    /// Enrich stage output
    pub coordinates: Option<Coordinates>,
    pub travel_times: Vec<TravelTime>,
    pub nearby: Vec<NearbyPlace>,
    pub enriched: Option<EnrichedText>,
    pub enrich_error: Option<String>,

    /// Notify stage output
    pub notified: bool,
    pub notify_error: Option<String>,

    /// Last stage the record passed through
    pub stage: Stage,
}

impl ListingRecord {
    /// Create a fresh record for one pipeline invocation.
    pub fn new(page: ListingPage) -> Self {
        Self {
            page,
            extracted: None,
            extract_error: None,
            risk: None,
            risk_error: None,
            coordinates: None,
            travel_times: Vec::new(),
            nearby: Vec::new(),
            enriched: None,
            enrich_error: None,
            notified: false,
            notify_error: None,
            stage: Stage::Extract,
        }
    }

    /// The listing identity.
    pub fn key(&self) -> &ListingKey {
        &self.page.key
    }

    /// Whether extraction succeeded (downstream stages depend on this).
    pub fn extract_succeeded(&self) -> bool {
        self.extracted.is_some() && self.extract_error.is_none()
    }

    /// Project the record into the row persisted to the result store.
    pub fn to_listing(&self) -> Listing {
        let extracted = self.extracted.clone().unwrap_or_default();
        Listing {
            key: self.page.key.clone(),
            url: self.page.url.clone(),
            address: extracted.address,
            price_eur: extracted.price_eur,
            price_warm_eur: extracted.price_warm_eur,
            rooms: extracted.rooms,
            description: extracted.description,
            details: extracted.details,
            extract_error: self.extract_error.clone(),
            risk_score: self.risk.as_ref().map(|r| r.score),
            risk_flags: self
                .risk
                .as_ref()
                .map(|r| r.flags.clone())
                .unwrap_or_default(),
            risk_reasoning: self.risk.as_ref().map(|r| r.reasoning.clone()),
            risk_error: self.risk_error.clone(),
            travel_times: self.travel_times.clone(),
            nearby: self.nearby.clone(),
            description_en: self.enriched.as_ref().map(|e| e.description_en.clone()),
            narrative: self.enriched.as_ref().map(|e| e.narrative.clone()),
            value_score: self.enriched.as_ref().map(|e| e.value_score),
            enrich_error: self.enrich_error.clone(),
            notified: self.notified,
            notify_error: self.notify_error.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Terminal projection of a pipeline record: the structured listing row.
///
/// Upserted into the result store by identity; a later run for the same
/// identity fully replaces this row, there is no cross-run field merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub key: ListingKey,
    pub url: String,

    // Extract stage
    pub address: Option<String>,
    pub price_eur: Option<f64>,
    pub price_warm_eur: Option<f64>,
    pub rooms: Option<f64>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub extract_error: Option<String>,

    // Risk stage
    pub risk_score: Option<f64>,
    pub risk_flags: Vec<String>,
    pub risk_reasoning: Option<String>,
    pub risk_error: Option<String>,

    // Enrich stage
    pub travel_times: Vec<TravelTime>,
    pub nearby: Vec<NearbyPlace>,
    pub description_en: Option<String>,
    pub narrative: Option<String>,
    pub value_score: Option<f64>,
    pub enrich_error: Option<String>,

    // Notify stage
    pub notified: bool,
    pub notify_error: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Whether any stage recorded an error.
    pub fn has_errors(&self) -> bool {
        self.extract_error.is_some()
            || self.risk_error.is_some()
            || self.enrich_error.is_some()
            || self.notify_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::{ContentKind, Source};

    fn record() -> ListingRecord {
        let page = ListingPage::new(
            ListingKey::new(Source::Kleinanzeigen, "42"),
            "https://www.kleinanzeigen.de/s-anzeige/x/42",
            ContentKind::Text,
            "2 Zimmer Wohnung",
        );
        ListingRecord::new(page)
    }

    #[test]
    fn test_fresh_record_starts_at_extract() {
        let record = record();
        assert_eq!(record.stage, Stage::Extract);
        assert!(!record.extract_succeeded());
        assert!(!record.notified);
    }

    #[test]
    fn test_projection_carries_error_markers() {
        let mut record = record();
        record.extract_error = Some("timeout".to_string());
        record.stage = Stage::Done;

        let listing = record.to_listing();
        assert_eq!(listing.extract_error.as_deref(), Some("timeout"));
        assert!(listing.address.is_none());
        assert!(listing.risk_score.is_none());
        assert!(listing.has_errors());
    }

    #[test]
    fn test_projection_flattens_extracted_fields() {
        let mut record = record();
        record.extracted = Some(ExtractedListing {
            address: Some("Vor dem Steintor 1, 28203 Bremen".to_string()),
            price_eur: Some(500.0),
            price_warm_eur: Some(650.0),
            rooms: Some(2.0),
            description: Some("Schöne Wohnung".to_string()),
            details: None,
        });

        let listing = record.to_listing();
        assert_eq!(listing.price_eur, Some(500.0));
        assert_eq!(listing.rooms, Some(2.0));
        assert!(!listing.has_errors());
    }
}
