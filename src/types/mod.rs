//! Domain data types for listing discovery and enrichment.

pub mod config;
pub mod listing;
pub mod record;
