//! Listing identity and raw page types.
//!
//! The [`ListingKey`] is the identity used throughout the system: two
//! discoveries of the same `(source, external_id)` pair are the *same*
//! listing, and later writes overwrite earlier ones. A listing's URL is
//! attached data, not part of its identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported listing sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Immobilienscout24,
    Kleinanzeigen,
}

impl Source {
    /// Stable string id used for persistence and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Immobilienscout24 => "immobilienscout24",
            Source::Kleinanzeigen => "kleinanzeigen",
        }
    }

    /// Human-readable site name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::Immobilienscout24 => "ImmobilienScout24",
            Source::Kleinanzeigen => "Kleinanzeigen",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "immobilienscout24" => Ok(Source::Immobilienscout24),
            "kleinanzeigen" => Ok(Source::Kleinanzeigen),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// Identity key uniquely naming a listing across all stages and stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingKey {
    /// Site the listing was discovered on
    pub source: Source,

    /// Site-scoped listing id (e.g. the exposé number)
    pub external_id: String,
}

impl ListingKey {
    /// Create a new listing key.
    pub fn new(source: Source, external_id: impl Into<String>) -> Self {
        Self {
            source,
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.external_id)
    }
}

/// A listing link produced by discovery.
///
/// Ephemeral pipeline input; persisted in the link store only as a cache
/// of "known to exist". Unique by [`ListingKey`] within a discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredLink {
    /// Listing identity
    pub key: ListingKey,

    /// Full listing URL (last-seen wins on duplicate identity)
    pub url: String,

    /// Search city the link was discovered for
    pub city: Option<String>,
}

impl DiscoveredLink {
    /// Create a new discovered link.
    pub fn new(key: ListingKey, url: impl Into<String>) -> Self {
        Self {
            key,
            url: url.into(),
            city: None,
        }
    }

    /// Set the city.
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }
}

/// Kind of content stored for a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Html,
    Text,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Html => "html",
            ContentKind::Text => "text",
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "html" => Ok(ContentKind::Html),
            "text" => Ok(ContentKind::Text),
            other => Err(format!("unknown content kind: {other}")),
        }
    }
}

/// A fetched listing page, keyed by identity.
///
/// Owned by the page store; mutable via full overwrite only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPage {
    /// Listing identity
    pub key: ListingKey,

    /// URL the content was fetched from
    pub url: String,

    /// Whether `content` is raw/narrowed HTML or extracted plain text
    pub kind: ContentKind,

    /// Page content
    pub content: String,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,
}

impl ListingPage {
    /// Create a new page fetched just now.
    pub fn new(
        key: ListingKey,
        url: impl Into<String>,
        kind: ContentKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            key,
            url: url.into(),
            kind,
            content: content.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Check whether the page has non-whitespace content.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip() {
        for source in [Source::Immobilienscout24, Source::Kleinanzeigen] {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
    }

    #[test]
    fn test_unknown_source_rejected() {
        assert!("craigslist".parse::<Source>().is_err());
    }

    #[test]
    fn test_key_equality_ignores_url() {
        let a = DiscoveredLink::new(
            ListingKey::new(Source::Kleinanzeigen, "123"),
            "https://example.com/a",
        );
        let b = DiscoveredLink::new(
            ListingKey::new(Source::Kleinanzeigen, "123"),
            "https://example.com/b",
        );
        assert_eq!(a.key, b.key);
        assert_ne!(a.url, b.url);
    }

    #[test]
    fn test_key_display() {
        let key = ListingKey::new(Source::Immobilienscout24, "98765");
        assert_eq!(key.to_string(), "immobilienscout24:98765");
    }
}
