//! Configuration types for discovery, acquisition, and enrichment.

use serde::{Deserialize, Serialize};

use crate::types::listing::Source;

/// How city names are turned into URL slugs for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitySlug {
    /// "Bad Homburg" → "bad-homburg"
    Lower,
    /// "bad homburg" → "Bad-Homburg"
    Title,
}

/// Scraping shape of one supported listing site.
///
/// Only ids and URLs are scraped from search pages; all sites are
/// city-based. `search_path` contains a `{city}` placeholder; `page_path`,
/// when present, contains `{city}` and `{page}` and is used for page ≥ 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Site identity
    pub source: Source,

    /// Base URL without trailing slash
    pub base_url: String,

    /// Search path template with `{city}`
    pub search_path: String,

    /// Substring a listing link must contain
    pub link_contains: String,

    /// Regex capturing the external id from a listing URL
    pub id_regex: String,

    /// City slug style
    pub city_slug: CitySlug,

    /// Path template for result pages after the first (optional)
    pub page_path: Option<String>,
}

impl SiteProfile {
    /// Slugify a city name for this site.
    pub fn slugify_city(&self, city: &str) -> String {
        let trimmed = city.trim();
        match self.city_slug {
            CitySlug::Lower => trimmed.to_lowercase().replace(' ', "-"),
            CitySlug::Title => trimmed
                .split_whitespace()
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>() + chars.as_str()
                        }
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join("-"),
        }
    }

    /// Search-results URL for the given city and 1-based page number.
    ///
    /// Returns `None` for page ≥ 2 when the site has no paging template.
    pub fn search_url(&self, city: &str, page: usize) -> Option<String> {
        let slug = self.slugify_city(city);
        let base = self.base_url.trim_end_matches('/');
        if page <= 1 {
            Some(format!("{base}{}", self.search_path.replace("{city}", &slug)))
        } else {
            self.page_path.as_ref().map(|template| {
                format!(
                    "{base}{}",
                    template
                        .replace("{city}", &slug)
                        .replace("{page}", &page.to_string())
                )
            })
        }
    }
}

/// Built-in profiles for the supported German rental portals.
pub fn default_sites() -> Vec<SiteProfile> {
    vec![
        SiteProfile {
            source: Source::Immobilienscout24,
            base_url: "https://www.immobilienscout24.de".to_string(),
            search_path: "/Suche/de/{city}/wohnung-mieten".to_string(),
            link_contains: "/expose/".to_string(),
            id_regex: r"/expose/(\d+)".to_string(),
            city_slug: CitySlug::Lower,
            page_path: Some("/Suche/de/{city}/wohnung-mieten?pagenumber={page}".to_string()),
        },
        SiteProfile {
            source: Source::Kleinanzeigen,
            base_url: "https://www.kleinanzeigen.de".to_string(),
            search_path: "/s-wohnung-mieten/{city}/k0c203".to_string(),
            link_contains: "/s-anzeige/".to_string(),
            id_regex: r"/s-anzeige/[^/]+/(\d+)".to_string(),
            city_slug: CitySlug::Lower,
            page_path: Some("/s-wohnung-mieten/{city}/seite:{page}/k0c203".to_string()),
        },
    ]
}

/// Configuration for a discovery run.
#[derive(Debug, Clone)]
pub struct DiscoverConfig {
    /// Maximum search-result pages to follow per site (≥ 1)
    pub max_pages: usize,
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self { max_pages: 1 }
    }
}

impl DiscoverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page limit.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }
}

/// Content mode applied uniformly to an acquisition batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Store the full page HTML
    FullPage,
    /// Narrow to the main listing content (per-source selectors)
    MainContent,
    /// Extract normalized plain text
    Text,
}

/// Configuration for page acquisition.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Maximum fetches in flight simultaneously (≥ 1)
    pub max_concurrent: usize,

    /// How much of each page to keep
    pub content_mode: ContentMode,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            content_mode: ContentMode::Text,
        }
    }
}

impl AcquireConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency bound (clamped to ≥ 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Set the content mode.
    pub fn with_content_mode(mut self, mode: ContentMode) -> Self {
        self.content_mode = mode;
        self
    }
}

/// A fixed destination travel times are computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Short label used in travel-time rows and messages
    pub label: String,

    /// Full routable address
    pub address: String,
}

impl Destination {
    pub fn new(label: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
        }
    }
}

/// Configuration for the enrich stage.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Destinations travel times are computed for
    pub destinations: Vec<Destination>,

    /// Radius for the nearby-places lookup, in meters
    pub nearby_radius_m: u32,

    /// Origin used when the listing has no extracted address
    pub fallback_origin: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            destinations: vec![
                Destination::new(
                    "Constructor University",
                    "Constructor University, Campus Ring 1, 28759 Bremen, Germany",
                ),
                Destination::new("Bremen Hbf", "Bremen Hauptbahnhof, Germany"),
            ],
            // ~15 min walk
            nearby_radius_m: 1200,
            fallback_origin: "Bremen, Germany".to_string(),
        }
    }
}

impl EnrichConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the destination set.
    pub fn with_destinations(mut self, destinations: Vec<Destination>) -> Self {
        self.destinations = destinations;
        self
    }

    /// Set the nearby-places radius.
    pub fn with_nearby_radius(mut self, radius_m: u32) -> Self {
        self.nearby_radius_m = radius_m;
        self
    }

    /// Set the fallback origin for address-less listings.
    pub fn with_fallback_origin(mut self, origin: impl Into<String>) -> Self {
        self.fallback_origin = origin.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_lower() {
        let site = &default_sites()[0];
        assert_eq!(site.slugify_city(" Bad Homburg "), "bad-homburg");
    }

    #[test]
    fn test_search_url_first_page() {
        let site = &default_sites()[0];
        assert_eq!(
            site.search_url("Bremen", 1).unwrap(),
            "https://www.immobilienscout24.de/Suche/de/bremen/wohnung-mieten"
        );
    }

    #[test]
    fn test_search_url_later_page() {
        let site = &default_sites()[1];
        assert_eq!(
            site.search_url("Bremen", 3).unwrap(),
            "https://www.kleinanzeigen.de/s-wohnung-mieten/bremen/seite:3/k0c203"
        );
    }

    #[test]
    fn test_no_page_template_means_no_paging() {
        let mut site = default_sites()[0].clone();
        site.page_path = None;
        assert!(site.search_url("Bremen", 2).is_none());
    }

    #[test]
    fn test_acquire_config_clamps_concurrency() {
        let config = AcquireConfig::new().with_max_concurrent(0);
        assert_eq!(config.max_concurrent, 1);
    }
}
