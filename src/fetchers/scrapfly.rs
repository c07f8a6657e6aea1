//! Scrapfly-backed fetcher.
//!
//! Uses the Scrapfly scrape API for pages behind bot protection: anti-scrape
//! protection bypass, JavaScript rendering, and a country-scoped proxy pool.
//! The German rental portals require all three.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::security::SecretString;
use crate::traits::fetcher::Fetcher;

const SCRAPFLY_API_URL: &str = "https://api.scrapfly.io/scrape";

/// Fetcher backed by the Scrapfly scrape API.
pub struct ScrapflyFetcher {
    client: reqwest::Client,
    api_key: SecretString,
    country: String,
    render_js: bool,
    anti_scraping_protection: bool,
}

impl ScrapflyFetcher {
    /// Create a new Scrapfly fetcher with defaults for German portals
    /// (DE proxy, JS rendering, ASP on).
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(90))
                .build()
                .expect("Failed to create HTTP client"),
            api_key: api_key.into(),
            country: "de".to_string(),
            render_js: true,
            anti_scraping_protection: true,
        }
    }

    /// Create from the `SCRAPFLY_API_KEY` environment variable.
    pub fn from_env() -> FetchResult<Self> {
        let api_key = std::env::var("SCRAPFLY_API_KEY")
            .map_err(|_| FetchError::Api("SCRAPFLY_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Set the proxy country code.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Enable or disable JavaScript rendering.
    pub fn with_render_js(mut self, render_js: bool) -> Self {
        self.render_js = render_js;
        self
    }

    /// Enable or disable anti-scraping protection bypass.
    pub fn with_asp(mut self, asp: bool) -> Self {
        self.anti_scraping_protection = asp;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    result: Option<ScrapeResult>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResult {
    content: Option<String>,
    #[serde(default)]
    status_code: Option<u16>,
}

#[async_trait]
impl Fetcher for ScrapflyFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        debug!(url = %url, "Scrapfly fetch starting");

        let response = self
            .client
            .get(SCRAPFLY_API_URL)
            .query(&[
                ("key", self.api_key.expose()),
                ("url", url),
                ("country", &self.country),
                ("asp", bool_param(self.anti_scraping_protection)),
                ("render_js", bool_param(self.render_js)),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Scrapfly request failed");
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Http(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(format!(
                "scrapfly returned {status}: {body}"
            )));
        }

        let payload: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let result = payload.result.ok_or_else(|| FetchError::EmptyContent {
            url: url.to_string(),
        })?;

        if let Some(code) = result.status_code {
            if code >= 400 {
                return Err(FetchError::Status {
                    status: code,
                    url: url.to_string(),
                });
            }
        }

        match result.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(FetchError::EmptyContent {
                url: url.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scrapfly"
    }
}

fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
