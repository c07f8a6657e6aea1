//! Environment-backed application configuration.
//!
//! Loads `.env` via `dotenvy` and exposes the optional API credentials the
//! capability clients need. Every key is optional: a missing key disables
//! the corresponding capability rather than failing startup (the notifier,
//! for example, becomes a deliberate no-op when unconfigured).

use crate::security::SecretString;

/// Application configuration read from the environment.
#[derive(Debug)]
pub struct AppConfig {
    /// Scrapfly API key (anti-bot page fetching)
    pub scrapfly_api_key: Option<SecretString>,

    /// Anthropic API key (extraction, risk, enrichment)
    pub anthropic_api_key: Option<SecretString>,

    /// Google Maps API key (geocoding, routing, places)
    pub google_maps_api_key: Option<SecretString>,

    /// Telegram bot token (notifications)
    pub telegram_bot_token: Option<SecretString>,

    /// Telegram chat id to notify
    pub telegram_chat_id: Option<String>,

    /// SQLite database URL
    pub database_url: String,
}

impl AppConfig {
    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Self {
        // Ignore a missing .env file; real env vars still apply.
        let _ = dotenvy::dotenv();

        Self {
            scrapfly_api_key: secret_var("SCRAPFLY_API_KEY"),
            anthropic_api_key: secret_var("ANTHROPIC_API_KEY"),
            google_maps_api_key: secret_var("GOOGLE_MAPS_API_KEY"),
            telegram_bot_token: secret_var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: plain_var("TELEGRAM_CHAT_ID"),
            database_url: plain_var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:data/listings.db?mode=rwc".to_string()),
        }
    }

    /// Whether the notification channel is configured.
    pub fn telegram_configured(&self) -> bool {
        self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }
}

fn plain_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn secret_var(name: &str) -> Option<SecretString> {
    plain_var(name).map(SecretString::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_var_treated_as_absent() {
        std::env::set_var("FLATWATCH_TEST_EMPTY", "  ");
        assert!(plain_var("FLATWATCH_TEST_EMPTY").is_none());
        std::env::remove_var("FLATWATCH_TEST_EMPTY");
    }

    #[test]
    fn test_secret_var_wraps_value() {
        std::env::set_var("FLATWATCH_TEST_SECRET", "key-123");
        let secret = secret_var("FLATWATCH_TEST_SECRET").unwrap();
        assert_eq!(secret.expose(), "key-123");
        std::env::remove_var("FLATWATCH_TEST_SECRET");
    }
}
