//! Discovery: scrape search-result pages for listing links.
//!
//! Discovery visits each configured site's search results for one city,
//! follows result pages up to the configured limit, and produces links
//! deduplicated by listing identity. A failed, unparseable, or empty
//! page stops paging for that site only; links already collected from
//! other sites are kept.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::scrape::links::parse_listing_links;
use crate::traits::fetcher::Fetcher;
use crate::traits::store::LinkStore;
use crate::types::config::{DiscoverConfig, SiteProfile};
use crate::types::listing::{DiscoveredLink, ListingKey};

/// Counts from one discovery-and-persist run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscoverReport {
    /// Distinct listing identities seen in this run
    pub found: usize,

    /// Identities not previously present in the link store
    pub new: usize,
}

/// Discover listing links for one city across the given sites.
///
/// Links are deduplicated by `(source, external_id)`; when the same
/// identity appears more than once, the last URL seen wins. Order of the
/// result follows first appearance.
pub async fn discover(
    fetcher: &dyn Fetcher,
    sites: &[SiteProfile],
    city: &str,
    config: &DiscoverConfig,
) -> Result<Vec<DiscoveredLink>> {
    let mut by_key: HashMap<ListingKey, usize> = HashMap::new();
    let mut links: Vec<DiscoveredLink> = Vec::new();

    for site in sites {
        let mut site_found = 0usize;

        for page in 1..=config.max_pages {
            let Some(url) = site.search_url(city, page) else {
                debug!(source = %site.source, page, "no paging template, stopping");
                break;
            };

            let html = match fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(source = %site.source, page, url = %url, error = %e,
                        "search page fetch failed, stopping paging for site");
                    break;
                }
            };

            let parsed = match parse_listing_links(&html, site) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(source = %site.source, page, error = %e,
                        "search page parse failed, stopping paging for site");
                    break;
                }
            };
            if parsed.is_empty() {
                debug!(source = %site.source, page, "no listing links, stopping paging");
                break;
            }

            site_found += parsed.len();
            for link in parsed {
                let key = ListingKey::new(site.source, link.external_id);
                let discovered =
                    DiscoveredLink::new(key.clone(), link.url).with_city(city);
                match by_key.get(&key) {
                    Some(&idx) => links[idx] = discovered,
                    None => {
                        by_key.insert(key, links.len());
                        links.push(discovered);
                    }
                }
            }
        }

        info!(source = %site.source, city = %city, found = site_found, "site discovery done");
    }

    Ok(links)
}

/// Discover links and upsert them into the link store.
///
/// Returns how many distinct identities were seen and how many of those
/// were not already known. Re-running with unchanged search results is
/// idempotent: `new` is zero and the stored state does not change.
pub async fn discover_into_store<S: LinkStore + ?Sized>(
    fetcher: &dyn Fetcher,
    store: &S,
    sites: &[SiteProfile],
    city: &str,
    config: &DiscoverConfig,
) -> Result<DiscoverReport> {
    let links = discover(fetcher, sites, city, config).await?;

    let mut report = DiscoverReport {
        found: links.len(),
        new: 0,
    };
    for link in &links {
        if store.get_link(&link.key).await?.is_none() {
            report.new += 1;
        }
        store.upsert_link(link).await?;
    }

    info!(city = %city, found = report.found, new = report.new, "discovery persisted");
    Ok(report)
}
