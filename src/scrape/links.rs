//! Extract listing links from search-result HTML.

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{PipelineError, Result};
use crate::types::config::SiteProfile;

/// A listing URL plus its site-scoped external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLink {
    pub url: String,
    pub external_id: String,
}

/// Find all `<a href>` matching the site's link shape.
///
/// Hrefs are filtered by the profile's `link_contains` substring,
/// normalized to absolute URLs without query/fragment, and deduplicated
/// by URL. The external id is the first non-empty capture of the
/// profile's `id_regex`; links the regex doesn't match fall back to the
/// URL path relative to the site base.
pub fn parse_listing_links(html: &str, site: &SiteProfile) -> Result<Vec<ParsedLink>> {
    let id_pattern = Regex::new(&site.id_regex)
        .map_err(|e| PipelineError::Config(format!("bad id_regex for {}: {e}", site.source)))?;
    let base = Url::parse(&site.base_url)
        .map_err(|e| PipelineError::Config(format!("bad base_url for {}: {e}", site.source)))?;
    let base_str = site.base_url.trim_end_matches('/');

    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href]")
        .map_err(|e| PipelineError::Config(format!("selector parse: {e}")))?;

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for element in document.select(&anchor) {
        let href = element.value().attr("href").unwrap_or("").trim();
        if href.is_empty()
            || !href.contains(&site.link_contains)
            || href.starts_with('#')
            || href.starts_with("javascript:")
        {
            continue;
        }

        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }

        let mut full = resolved.to_string();
        if let Some(idx) = full.find(|c| c == '?' || c == '#') {
            full.truncate(idx);
        }
        let full = full.trim_end_matches('/').to_string();

        if !seen.insert(full.clone()) {
            continue;
        }

        let external_id = match id_pattern.captures(&full) {
            Some(caps) => caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .next()
                .unwrap_or_else(|| full.clone()),
            None => {
                let trimmed = full
                    .strip_prefix(base_str)
                    .unwrap_or(&full)
                    .trim_matches('/');
                if trimmed.is_empty() {
                    full.clone()
                } else {
                    trimmed.to_string()
                }
            }
        };

        out.push(ParsedLink { url: full, external_id });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::default_sites;

    fn scout() -> SiteProfile {
        default_sites()[0].clone()
    }

    #[test]
    fn test_extracts_ids_from_expose_links() {
        let html = r#"
            <html><body>
              <a href="/expose/12345?referrer=search">Wohnung 1</a>
              <a href="https://www.immobilienscout24.de/expose/67890/">Wohnung 2</a>
              <a href="/contact">Kontakt</a>
            </body></html>
        "#;

        let links = parse_listing_links(html, &scout()).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].external_id, "12345");
        assert_eq!(
            links[0].url,
            "https://www.immobilienscout24.de/expose/12345"
        );
        assert_eq!(links[1].external_id, "67890");
    }

    #[test]
    fn test_dedupes_by_url() {
        let html = r#"
            <a href="/expose/111">erste</a>
            <a href="/expose/111#gallery">zweite</a>
        "#;

        let links = parse_listing_links(html, &scout()).unwrap();
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_skips_javascript_and_fragment_hrefs() {
        let html = r##"
            <a href="javascript:void(0)//expose/1">nope</a>
            <a href="#/expose/2">nope</a>
        "##;

        let links = parse_listing_links(html, &scout()).unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_kleinanzeigen_id_pattern() {
        let site = default_sites()[1].clone();
        let html = r#"<a href="/s-anzeige/schoene-wohnung-mit-balkon/2345678901">ad</a>"#;

        let links = parse_listing_links(html, &site).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].external_id, "2345678901");
    }

    #[test]
    fn test_empty_page_yields_no_links() {
        let links = parse_listing_links("<html><body></body></html>", &scout()).unwrap();
        assert!(links.is_empty());
    }
}
