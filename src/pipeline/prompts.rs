//! All LLM prompts (system and user).
//!
//! Centralized so they can be tuned and versioned in one place.

use crate::types::listing::ListingPage;
use crate::types::record::{ExtractedListing, TravelTime};

// ---------- Extract listing from page content ----------

pub const EXTRACT_SYSTEM: &str = "\
You are an expert at extracting structured rental listing data from German real estate ad text.
The input is text scraped from a listing page (ImmobilienScout24, Kleinanzeigen, or similar German sites).

Rules:
- address: Full address if given (street, number, postal code, city). Otherwise null.
- price_eur: Monthly cold rent (Kaltmiete) in EUR as a number. null only if truly not stated.
- price_warm_eur: Monthly warm/total rent (Warmmiete, Gesamtmiete) in EUR as a number. null only if not stated.
- rooms: Number of rooms (Zimmer). Can be decimal e.g. 2.5. null if not found.
- description: The main listing description text, cleaned (no repeated headers or \"read more\"). null if none.
- details: A short, human-readable summary of the most important extra details a renter would care \
about (area in m², heating type, condition, availability date, deposit, pets, balcony, cellar, \
energy class, furnished). One or two sentences or bullet-style phrases; no JSON. null if nothing useful.

Output only a valid JSON object with exactly these keys. No markdown or explanation.";

pub fn format_extract_user(page: &ListingPage) -> String {
    format!(
        "Extract the rental listing data from this ad text.\n\n\
         Source: {}\nURL: {}\n\n--- Ad text ---\n{}\n--- End ---",
        page.key.source, page.url, page.content
    )
}

// ---------- Fraud risk assessment ----------

pub const RISK_SYSTEM: &str = "\
You assess German rental listings for fraud risk. Typical signals: price far below market, \
no address, landlord abroad, payment before viewing, pressure to act fast, stock photos, \
vague or machine-translated text.

Output only a valid JSON object:
- score: number between 0.0 (likely fraud) and 1.0 (likely legitimate)
- flags: array of short strings naming the issues found (empty if none)
- reasoning: one or two sentences explaining the assessment

No markdown or explanation outside the JSON.";

pub fn format_risk_user(listing: &ExtractedListing) -> String {
    format!(
        "Assess this rental listing for fraud risk.\n\n\
         Address: {}\nCold rent (EUR): {}\nWarm rent (EUR): {}\nRooms: {}\n\
         Details: {}\n\nDescription:\n{}",
        field(&listing.address),
        number(listing.price_eur),
        number(listing.price_warm_eur),
        number(listing.rooms),
        field(&listing.details),
        field(&listing.description),
    )
}

// ---------- Enrichment: translation, narrative, value score ----------

pub const ENRICH_SYSTEM: &str = "\
You help a renter evaluate a German rental listing. Given the listing fields and travel times \
to their fixed destinations, produce:
- description_en: the listing description translated to clear English (empty string if no description)
- narrative: a short English summary of the listing and its location (2-3 sentences)
- value_score: value for money between 0.0 (terrible) and 1.0 (excellent), considering price, \
size, rooms, condition, and travel times

Output only a valid JSON object with exactly these keys. No markdown or explanation.";

pub fn format_enrich_user(listing: &ExtractedListing, travel_times: &[TravelTime]) -> String {
    let travel = if travel_times.is_empty() {
        "unknown".to_string()
    } else {
        travel_times
            .iter()
            .map(|t| {
                format!(
                    "{} ({}): {:.0} min",
                    t.destination, t.mode, t.estimate.minutes
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        "Evaluate this rental listing.\n\n\
         Address: {}\nCold rent (EUR): {}\nWarm rent (EUR): {}\nRooms: {}\n\
         Details: {}\nTravel times: {}\n\nDescription:\n{}",
        field(&listing.address),
        number(listing.price_eur),
        number(listing.price_warm_eur),
        number(listing.rooms),
        field(&listing.details),
        travel,
        field(&listing.description),
    )
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(not stated)")
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => "(not stated)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::{ContentKind, ListingKey, Source};
    use crate::types::record::{TravelEstimate, TravelMode};

    #[test]
    fn test_extract_user_includes_source_and_content() {
        let page = ListingPage::new(
            ListingKey::new(Source::Kleinanzeigen, "1"),
            "https://www.kleinanzeigen.de/s-anzeige/x/1",
            ContentKind::Text,
            "2 Zimmer, 500 EUR kalt",
        );
        let prompt = format_extract_user(&page);
        assert!(prompt.contains("Source: kleinanzeigen"));
        assert!(prompt.contains("2 Zimmer, 500 EUR kalt"));
    }

    #[test]
    fn test_risk_user_renders_absent_fields() {
        let prompt = format_risk_user(&ExtractedListing::default());
        assert!(prompt.contains("Address: (not stated)"));
        assert!(prompt.contains("Cold rent (EUR): (not stated)"));
    }

    #[test]
    fn test_enrich_user_lists_travel_times() {
        let listing = ExtractedListing {
            price_eur: Some(500.0),
            ..Default::default()
        };
        let travel = vec![TravelTime {
            destination: "Bremen Hbf".to_string(),
            mode: TravelMode::Transit,
            estimate: TravelEstimate {
                minutes: 18.4,
                km: 4.2,
            },
        }];
        let prompt = format_enrich_user(&listing, &travel);
        assert!(prompt.contains("Bremen Hbf (transit): 18 min"));
        assert!(prompt.contains("Cold rent (EUR): 500"));
    }
}
