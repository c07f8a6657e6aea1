//! Telegram notifier.
//!
//! Sends the compact summary as a plain message and the full detail as a
//! document attachment, so long descriptions never hit Telegram's message
//! length limit.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{NotifyError, NotifyResult};
use crate::security::SecretString;
use crate::traits::notifier::Notifier;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DETAIL_FILENAME: &str = "listing.txt";

/// Notifier backed by the Telegram Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: SecretString,
    chat_id: String,
    api_base: String,
}

impl TelegramNotifier {
    /// Create a notifier for one bot and chat.
    pub fn new(bot_token: impl Into<SecretString>, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Override the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Build from configuration; `None` when the channel is unconfigured.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(Self::new(token.clone(), chat_id.clone())),
            _ => None,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token.expose())
    }

    async fn send_message(&self, text: &str) -> NotifyResult<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::Http(Box::new(e)))?;

        check_response(response).await
    }

    async fn send_document(&self, filename: &str, content: &str) -> NotifyResult<()> {
        let part = reqwest::multipart::Part::text(content.to_string())
            .file_name(filename.to_string())
            .mime_str("text/plain")
            .map_err(|e| NotifyError::Http(Box::new(e)))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("document", part);

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::Http(Box::new(e)))?;

        check_response(response).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

async fn check_response(response: reqwest::Response) -> NotifyResult<()> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| NotifyError::Http(Box::new(e)))?;

    if !status.is_success() {
        return Err(NotifyError::Rejected(format!("HTTP {status}: {body}")));
    }

    let parsed: ApiResponse = serde_json::from_str(&body)
        .map_err(|e| NotifyError::Rejected(format!("unparseable response: {e}")))?;
    if !parsed.ok {
        return Err(NotifyError::Rejected(
            parsed
                .description
                .unwrap_or_else(|| "no description".to_string()),
        ));
    }
    Ok(())
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// Two-call dispatch: summary message, then detail document. Either
    /// call failing fails the dispatch, so a half-delivered notification
    /// ends up with a `notify_error` on the record.
    async fn send(&self, summary: &str, detail: &str) -> NotifyResult<()> {
        debug!(chat_id = %self.chat_id, "sending Telegram notification");
        self.send_message(summary).await?;

        self.send_document(DETAIL_FILENAME, detail)
            .await
            .map_err(|e| {
                warn!(chat_id = %self.chat_id, error = %e, "detail attachment failed");
                e
            })
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve exactly one successful Bot API response on a local port,
    /// then close the listener so the next request is refused.
    async fn serve_one_ok() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Close the listener before serving: once the client has
            // read this response, follow-up connections are refused.
            drop(listener);

            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(header_end) = find(&buf, b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let body = r#"{"ok":true,"result":{}}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[tokio::test]
    async fn test_document_failure_fails_the_dispatch() {
        // sendMessage succeeds, then the listener is gone and
        // sendDocument cannot connect.
        let api_base = serve_one_ok().await;
        let notifier = TelegramNotifier::new("123:abc", "42").with_api_base(api_base);

        let result = notifier.send("summary", "detail").await;
        assert!(matches!(result, Err(NotifyError::Http(_))));
    }

    #[test]
    fn test_api_response_parsing() {
        let ok: ApiResponse = serde_json::from_str(r#"{"ok": true, "result": {}}"#).unwrap();
        assert!(ok.ok);

        let err: ApiResponse =
            serde_json::from_str(r#"{"ok": false, "description": "chat not found"}"#).unwrap();
        assert!(!err.ok);
        assert_eq!(err.description.as_deref(), Some("chat not found"));
    }

    #[test]
    fn test_method_url_embeds_token() {
        let notifier = TelegramNotifier::new("123:abc", "42");
        assert_eq!(
            notifier.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_from_config_requires_both_values() {
        let config = AppConfig {
            scrapfly_api_key: None,
            anthropic_api_key: None,
            google_maps_api_key: None,
            telegram_bot_token: Some(SecretString::new("123:abc")),
            telegram_chat_id: None,
            database_url: "sqlite::memory:".to_string(),
        };
        assert!(TelegramNotifier::from_config(&config).is_none());
    }
}
