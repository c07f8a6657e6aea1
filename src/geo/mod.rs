//! Geocoding, routing, and nearby-place implementations.

pub mod google;

pub use google::GoogleMaps;
