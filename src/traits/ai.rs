//! AI trait for the LLM capabilities the pipeline invokes.
//!
//! One capability per method so the state machine is testable with
//! deterministic fakes; implementations wrap a specific model provider
//! and handle prompting and response parsing.

use async_trait::async_trait;

use crate::error::AiResult;
use crate::types::listing::ListingPage;
use crate::types::record::{EnrichedText, ExtractedListing, RiskAssessment, TravelTime};

/// LLM capabilities consumed by the enrichment pipeline.
///
/// Every method may fail or time out; the pipeline records such failures
/// on the listing record instead of propagating them.
#[async_trait]
pub trait ListingAi: Send + Sync {
    /// Extract structured listing fields from page content.
    ///
    /// The only hard dependency in the pipeline: downstream stages are
    /// skipped when this fails.
    async fn extract_listing(&self, page: &ListingPage) -> AiResult<ExtractedListing>;

    /// Assess fraud risk for an extracted listing.
    async fn assess_risk(&self, listing: &ExtractedListing) -> AiResult<RiskAssessment>;

    /// Translate/summarize a listing and score its value for money.
    ///
    /// Travel times are passed in as context for the value score; they may
    /// be empty when geocoding or routing failed.
    async fn enrich_listing(
        &self,
        listing: &ExtractedListing,
        travel_times: &[TravelTime],
    ) -> AiResult<EnrichedText>;
}
