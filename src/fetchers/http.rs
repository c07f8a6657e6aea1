//! Plain HTTP fetcher.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::Fetcher;

/// Fetches pages with a plain HTTP client.
///
/// Suitable for unprotected sites and tests. The German rental portals
/// sit behind bot protection and JS rendering; use [`super::ScrapflyFetcher`]
/// for those.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a new HTTP fetcher with a 30s timeout.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: "flatwatch/0.1".to_string(),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        debug!(url = %url, "HTTP fetch starting");

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
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
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| FetchError::Http(Box::new(e)))
    }

    fn name(&self) -> &str {
        "http"
    }
}
