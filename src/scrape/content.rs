//! Narrow listing pages to their main content or plain text.
//!
//! Source-specific selectors are tried first, then generic semantic tags,
//! then the `<body>` with scripts and styles stripped. Narrowing never
//! fails: when nothing matches, the original HTML is returned unchanged.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

use crate::types::config::ContentMode;
use crate::types::listing::{ContentKind, Source};

/// Minimum text length for a selector match to count as "the content".
const MIN_CONTENT_CHARS: usize = 100;

/// Selectors to try per source, most specific first.
fn source_selectors(source: Option<Source>) -> &'static [&'static str] {
    match source {
        Some(Source::Immobilienscout24) => &[
            "main",
            "article",
            "#applicationHost",
            "#root",
            "#app",
            "[role='main']",
        ],
        Some(Source::Kleinanzeigen) => &["#main", "main", "article", "[role='main']"],
        None => &[],
    }
}

const GENERIC_SELECTORS: &[&str] = &["main", "article", "[role='main']"];

fn script_style_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap()
    })
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Return only the main content HTML of a listing page.
///
/// Falls back to the stripped `<body>`, then to the input unchanged.
pub fn extract_main_content(html: &str, source: Option<Source>) -> String {
    if html.trim().is_empty() {
        return html.to_string();
    }

    let document = Html::parse_document(html);

    for selector_str in source_selectors(source)
        .iter()
        .chain(GENERIC_SELECTORS.iter())
    {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text_len: usize = element.text().map(|t| t.trim().len()).sum();
            if text_len > MIN_CONTENT_CHARS {
                return element.html();
            }
        }
    }

    // Fallback: body only, strip script/style to reduce size
    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            return script_style_pattern()
                .replace_all(&body.html(), "")
                .into_owned();
        }
    }

    html.to_string()
}

/// Extract normalized plain text from listing page HTML.
///
/// Narrows to the main content first, drops script/style, and collapses
/// whitespace runs to single spaces. Returns `None` for blank input.
pub fn extract_text(html: &str, source: Option<Source>) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }

    let narrowed = extract_main_content(html, source);
    let cleaned = script_style_pattern().replace_all(&narrowed, " ");

    let document = Html::parse_document(&cleaned);
    let raw: String = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");

    let text = whitespace_pattern().replace_all(&raw, " ").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Apply the batch-wide content mode to fetched HTML.
pub fn apply_content_mode(
    html: &str,
    source: Source,
    mode: ContentMode,
) -> (ContentKind, String) {
    match mode {
        ContentMode::FullPage => (ContentKind::Html, html.to_string()),
        ContentMode::MainContent => {
            (ContentKind::Html, extract_main_content(html, Some(source)))
        }
        ContentMode::Text => (
            ContentKind::Text,
            extract_text(html, Some(source)).unwrap_or_default(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(main_content: &str) -> String {
        format!(
            "<html><head><style>.x{{color:red}}</style></head><body>\
             <nav>Navigation</nav><main>{main_content}</main>\
             <script>var x = 1;</script></body></html>"
        )
    }

    #[test]
    fn test_main_selector_wins_when_long_enough() {
        let content = "Schöne 2-Zimmer-Wohnung in Bremen. ".repeat(10);
        let html = page(&content);

        let narrowed = extract_main_content(&html, None);
        assert!(narrowed.starts_with("<main>"));
        assert!(!narrowed.contains("Navigation"));
    }

    #[test]
    fn test_short_main_falls_back_to_body() {
        let html = page("kurz");

        let narrowed = extract_main_content(&html, None);
        // Body fallback keeps nav but drops script/style
        assert!(narrowed.contains("Navigation"));
        assert!(!narrowed.contains("var x = 1"));
    }

    #[test]
    fn test_text_collapses_whitespace() {
        let content = format!("Kaltmiete:\n   500 €  \n\n Zimmer: 2 {}", "x ".repeat(60));
        let html = page(&content);

        let text = extract_text(&html, None).unwrap();
        assert!(text.contains("Kaltmiete: 500 € Zimmer: 2"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_blank_input_yields_none() {
        assert!(extract_text("   ", None).is_none());
    }

    #[test]
    fn test_apply_content_mode_full_page_is_identity() {
        let html = page("Inhalt");
        let (kind, content) =
            apply_content_mode(&html, Source::Kleinanzeigen, ContentMode::FullPage);
        assert_eq!(kind, ContentKind::Html);
        assert_eq!(content, html);
    }

    #[test]
    fn test_apply_content_mode_text() {
        let content = "Helle Altbauwohnung mit Balkon und Einbaukueche. ".repeat(5);
        let html = page(&content);
        let (kind, text) = apply_content_mode(&html, Source::Kleinanzeigen, ContentMode::Text);
        assert_eq!(kind, ContentKind::Text);
        assert!(text.contains("Helle Altbauwohnung"));
        assert!(!text.contains('<'));
    }
}
