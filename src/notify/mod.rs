//! Notification rendering and dispatch.
//!
//! Rendering is pure and infallible: any finished [`ListingRecord`] can
//! be formatted, with placeholders for absent fields. Dispatch lives
//! behind the [`crate::traits::notifier::Notifier`] trait; the Telegram
//! implementation is in [`telegram`].

pub mod telegram;

pub use telegram::TelegramNotifier;

use crate::types::record::{ListingRecord, TravelMode};

const NOT_STATED: &str = "n/a";

/// Compact one-message summary of a finished record.
///
/// Shown inline in the notification channel; the full detail goes out as
/// an attachment via [`build_detail`].
pub fn build_summary(record: &ListingRecord) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "🏠 {} — {}",
        record.page.key.source.display_name(),
        record
            .extracted
            .as_ref()
            .and_then(|e| e.address.as_deref())
            .unwrap_or("address unknown")
    ));

    let extracted = record.extracted.clone().unwrap_or_default();
    lines.push(format!(
        "💶 {} cold / {} warm · {} rooms",
        money(extracted.price_eur),
        money(extracted.price_warm_eur),
        count(extracted.rooms)
    ));

    match &record.risk {
        Some(risk) if risk.flags.is_empty() => {
            lines.push(format!("✅ risk score {:.2}", risk.score));
        }
        Some(risk) => {
            lines.push(format!(
                "⚠️ risk score {:.2} ({})",
                risk.score,
                risk.flags.join(", ")
            ));
        }
        None => lines.push(format!("❓ risk: {NOT_STATED}")),
    }

    for mode in [TravelMode::Walking, TravelMode::Transit] {
        let rows: Vec<String> = record
            .travel_times
            .iter()
            .filter(|t| t.mode == mode)
            .map(|t| format!("{} {:.0} min", t.destination, t.estimate.minutes))
            .collect();
        if !rows.is_empty() {
            let icon = match mode {
                TravelMode::Walking => "🚶",
                TravelMode::Transit => "🚆",
            };
            lines.push(format!("{icon} {}", rows.join(" · ")));
        }
    }

    if let Some(enriched) = &record.enriched {
        lines.push(format!("⭐ value {:.2}", enriched.value_score));
    }

    lines.push(record.page.url.clone());
    lines.join("\n")
}

/// Full-detail rendering of a finished record, attachment-sized.
///
/// Includes everything the summary drops: description (original and
/// translated), extracted details, risk reasoning, nearby places, and
/// any stage errors.
pub fn build_detail(record: &ListingRecord) -> String {
    let extracted = record.extracted.clone().unwrap_or_default();
    let mut out = String::new();

    push_section(&mut out, "Listing", &record.page.key.to_string());
    push_section(&mut out, "URL", &record.page.url);
    push_section(
        &mut out,
        "Address",
        extracted.address.as_deref().unwrap_or(NOT_STATED),
    );
    push_section(&mut out, "Cold rent (EUR)", &money(extracted.price_eur));
    push_section(&mut out, "Warm rent (EUR)", &money(extracted.price_warm_eur));
    push_section(&mut out, "Rooms", &count(extracted.rooms));
    push_section(
        &mut out,
        "Details",
        extracted.details.as_deref().unwrap_or(NOT_STATED),
    );
    push_section(
        &mut out,
        "Description",
        extracted.description.as_deref().unwrap_or(NOT_STATED),
    );

    if let Some(enriched) = &record.enriched {
        push_section(&mut out, "Description (EN)", &enriched.description_en);
        push_section(&mut out, "Narrative", &enriched.narrative);
        push_section(
            &mut out,
            "Value score",
            &format!("{:.2}", enriched.value_score),
        );
    }

    match &record.risk {
        Some(risk) => {
            push_section(&mut out, "Risk score", &format!("{:.2}", risk.score));
            if !risk.flags.is_empty() {
                push_section(&mut out, "Risk flags", &risk.flags.join(", "));
            }
            push_section(&mut out, "Risk reasoning", &risk.reasoning);
        }
        None => push_section(&mut out, "Risk score", NOT_STATED),
    }

    if !record.travel_times.is_empty() {
        let rows: Vec<String> = record
            .travel_times
            .iter()
            .map(|t| {
                format!(
                    "- {} ({}): {:.0} min, {:.1} km",
                    t.destination, t.mode, t.estimate.minutes, t.estimate.km
                )
            })
            .collect();
        push_section(&mut out, "Travel times", &rows.join("\n"));
    }

    if !record.nearby.is_empty() {
        let rows: Vec<String> = record
            .nearby
            .iter()
            .map(|p| {
                let categories = if p.categories.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", p.categories.join(", "))
                };
                format!("- {}{} ({})", p.name, categories, p.vicinity)
            })
            .collect();
        push_section(&mut out, "Nearby", &rows.join("\n"));
    }

    let mut errors = Vec::new();
    if let Some(e) = &record.extract_error {
        errors.push(format!("extract: {e}"));
    }
    if let Some(e) = &record.risk_error {
        errors.push(format!("risk: {e}"));
    }
    if let Some(e) = &record.enrich_error {
        errors.push(format!("enrich: {e}"));
    }
    if !errors.is_empty() {
        push_section(&mut out, "Errors", &errors.join("\n"));
    }

    out
}

fn push_section(out: &mut String, title: &str, body: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(title);
    out.push_str(": ");
    out.push_str(body);
}

fn money(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.0} €"),
        None => NOT_STATED.to_string(),
    }
}

fn count(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            if v.fract() == 0.0 {
                format!("{v:.0}")
            } else {
                format!("{v}")
            }
        }
        None => NOT_STATED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::{ContentKind, ListingKey, ListingPage, Source};
    use crate::types::record::{
        ExtractedListing, RiskAssessment, TravelEstimate, TravelTime,
    };

    fn record() -> ListingRecord {
        let page = ListingPage::new(
            ListingKey::new(Source::Immobilienscout24, "555"),
            "https://www.immobilienscout24.de/expose/555",
            ContentKind::Text,
            "irrelevant here",
        );
        ListingRecord::new(page)
    }

    #[test]
    fn test_summary_renders_placeholders_for_empty_record() {
        let summary = build_summary(&record());
        assert!(summary.contains("address unknown"));
        assert!(summary.contains("n/a cold / n/a warm"));
        assert!(summary.contains("https://www.immobilienscout24.de/expose/555"));
    }

    #[test]
    fn test_summary_renders_prices_and_risk() {
        let mut record = record();
        record.extracted = Some(ExtractedListing {
            address: Some("Findorffstraße 1, 28215 Bremen".to_string()),
            price_eur: Some(550.0),
            price_warm_eur: Some(700.0),
            rooms: Some(2.5),
            ..Default::default()
        });
        record.risk = Some(RiskAssessment {
            score: 0.9,
            flags: vec![],
            reasoning: "nothing suspicious".to_string(),
        });

        let summary = build_summary(&record);
        assert!(summary.contains("550 € cold / 700 € warm · 2.5 rooms"));
        assert!(summary.contains("✅ risk score 0.90"));
        assert!(summary.contains("Findorffstraße 1"));
    }

    #[test]
    fn test_summary_groups_travel_times_by_mode() {
        let mut record = record();
        record.travel_times = vec![
            TravelTime {
                destination: "Bremen Hbf".to_string(),
                mode: TravelMode::Walking,
                estimate: TravelEstimate { minutes: 25.0, km: 2.0 },
            },
            TravelTime {
                destination: "Bremen Hbf".to_string(),
                mode: TravelMode::Transit,
                estimate: TravelEstimate { minutes: 9.0, km: 2.2 },
            },
        ];

        let summary = build_summary(&record);
        assert!(summary.contains("🚶 Bremen Hbf 25 min"));
        assert!(summary.contains("🚆 Bremen Hbf 9 min"));
    }

    #[test]
    fn test_detail_includes_stage_errors() {
        let mut record = record();
        record.risk_error = Some("model timeout".to_string());
        record.enrich_error = Some("geocoding: quota".to_string());

        let detail = build_detail(&record);
        assert!(detail.contains("risk: model timeout"));
        assert!(detail.contains("enrich: geocoding: quota"));
        assert!(detail.contains("Address: n/a"));
    }
}
