//! Maps trait for geocoding, routing, and nearby-place lookups.

use async_trait::async_trait;

use crate::error::GeoResult;
use crate::types::config::Destination;
use crate::types::record::{Coordinates, NearbyPlace, TravelEstimate, TravelMode};

/// Geo capabilities consumed by the enrich stage.
#[async_trait]
pub trait MapsClient: Send + Sync {
    /// Geocode an address. `Ok(None)` means the provider found nothing,
    /// which is not an error.
    async fn geocode(&self, address: &str) -> GeoResult<Option<Coordinates>>;

    /// Travel durations from an origin address to each destination.
    ///
    /// Partial failure is expected: the result has one entry per
    /// destination, `None` where no route was found.
    async fn travel_times(
        &self,
        origin: &str,
        destinations: &[Destination],
        mode: TravelMode,
    ) -> GeoResult<Vec<Option<TravelEstimate>>>;

    /// Points of interest within `radius_m` of a point.
    ///
    /// An empty result is valid; implementations should prefer returning
    /// an empty list over an error for soft provider failures.
    async fn places_nearby(
        &self,
        center: Coordinates,
        radius_m: u32,
    ) -> GeoResult<Vec<NearbyPlace>>;
}
