//! HTML parsing: listing-link extraction and content narrowing.

pub mod content;
pub mod links;

pub use content::{apply_content_mode, extract_main_content, extract_text};
pub use links::{parse_listing_links, ParsedLink};
