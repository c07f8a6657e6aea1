//! Anthropic-backed implementation of [`ListingAi`].
//!
//! Every capability is a single messages-API call with a system prompt
//! that demands a bare JSON object; the response text is parsed into the
//! capability's output type. Markdown fences around the JSON are
//! tolerated, anything else is a [`AiError::MalformedOutput`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{AiError, AiResult};
use crate::pipeline::prompts;
use crate::security::SecretString;
use crate::traits::ai::ListingAi;
use crate::types::listing::ListingPage;
use crate::types::record::{EnrichedText, ExtractedListing, RiskAssessment, TravelTime};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// [`ListingAi`] implementation talking to the Anthropic messages API.
pub struct AnthropicAi {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

impl AnthropicAi {
    /// Create a client with the default model.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| AiError::Config("ANTHROPIC_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the per-call output token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// One messages-API round trip, parsed as JSON into `T`.
    async fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        user: String,
    ) -> AiResult<T> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "system": system,
                "messages": [{"role": "user", "content": user}],
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::Http(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "model API error");
            return Err(AiError::Api(format!("{status}: {body}")));
        }

        let payload: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AiError::Http(Box::new(e)))?;
        let text = payload
            .content
            .iter()
            .find_map(|block| block.text.as_deref())
            .ok_or_else(|| AiError::MalformedOutput("no text block in response".to_string()))?;

        debug!(chars = text.len(), "model output received");
        parse_json_output(text)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Parse model output as JSON, tolerating markdown code fences and
/// leading/trailing prose around the object.
fn parse_json_output<T: DeserializeOwned>(text: &str) -> AiResult<T> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(AiError::MalformedOutput(format!(
        "not a JSON object: {}",
        truncate(trimmed, 200)
    )))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[async_trait]
impl ListingAi for AnthropicAi {
    async fn extract_listing(&self, page: &ListingPage) -> AiResult<ExtractedListing> {
        self.complete_json(prompts::EXTRACT_SYSTEM, prompts::format_extract_user(page))
            .await
    }

    async fn assess_risk(&self, listing: &ExtractedListing) -> AiResult<RiskAssessment> {
        self.complete_json(prompts::RISK_SYSTEM, prompts::format_risk_user(listing))
            .await
    }

    async fn enrich_listing(
        &self,
        listing: &ExtractedListing,
        travel_times: &[TravelTime],
    ) -> AiResult<EnrichedText> {
        self.complete_json(
            prompts::ENRICH_SYSTEM,
            prompts::format_enrich_user(listing, travel_times),
        )
        .await
    }
}
