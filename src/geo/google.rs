//! Google-backed implementation of [`MapsClient`].
//!
//! Uses four Google endpoints:
//! - Geocoding API for address → coordinates
//! - Distance Matrix API for walking durations
//! - Routes API `computeRouteMatrix` for transit durations, with a
//!   per-destination Directions API fallback when the matrix call fails
//! - Places API (new) `searchNearby` for points of interest
//!
//! Transit durations depend on the departure time; all transit lookups
//! use the next weekday at 09:00 UTC so results are comparable across
//! listings and stable within a run.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{GeoError, GeoResult};
use crate::security::SecretString;
use crate::traits::maps::MapsClient;
use crate::types::config::Destination;
use crate::types::record::{Coordinates, NearbyPlace, TravelEstimate, TravelMode};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const ROUTE_MATRIX_URL: &str =
    "https://routes.googleapis.com/distanceMatrix/v2:computeRouteMatrix";
const PLACES_NEARBY_URL: &str = "https://places.googleapis.com/v1/places:searchNearby";

const MAX_NEARBY_RESULTS: u32 = 10;

/// [`MapsClient`] implementation over the Google Maps platform APIs.
pub struct GoogleMaps {
    client: reqwest::Client,
    api_key: SecretString,
}

impl GoogleMaps {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            api_key: api_key.into(),
        }
    }

    /// Create from the `GOOGLE_MAPS_API_KEY` environment variable.
    pub fn from_env() -> GeoResult<Self> {
        let api_key = std::env::var("GOOGLE_MAPS_API_KEY")
            .map_err(|_| GeoError::Config("GOOGLE_MAPS_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    async fn distance_matrix(
        &self,
        origin: &str,
        destinations: &[Destination],
        mode: &str,
    ) -> GeoResult<Vec<Option<TravelEstimate>>> {
        let joined = destinations
            .iter()
            .map(|d| d.address.as_str())
            .collect::<Vec<_>>()
            .join("|");

        let response = self
            .client
            .get(DISTANCE_MATRIX_URL)
            .query(&[
                ("origins", origin),
                ("destinations", &joined),
                ("mode", mode),
                ("key", self.api_key.expose()),
            ])
            .send()
            .await
            .map_err(|e| GeoError::Http(Box::new(e)))?;

        let payload: DistanceMatrixResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Http(Box::new(e)))?;
        if payload.status != "OK" {
            return Err(GeoError::Api(format!(
                "distance matrix status {}",
                payload.status
            )));
        }

        let row = payload
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| GeoError::Api("distance matrix returned no rows".to_string()))?;

        let mut estimates = Vec::with_capacity(destinations.len());
        for element in row.elements.into_iter() {
            estimates.push(element.into_estimate());
        }
        // Pad so the contract of one entry per destination holds.
        estimates.resize(destinations.len(), None);
        Ok(estimates)
    }

    /// Transit via the Routes API route matrix (one call for all
    /// destinations).
    async fn route_matrix_transit(
        &self,
        origin: &str,
        destinations: &[Destination],
        departure: DateTime<Utc>,
    ) -> GeoResult<Vec<Option<TravelEstimate>>> {
        let body = json!({
            "origins": [{"waypoint": {"address": origin}}],
            "destinations": destinations
                .iter()
                .map(|d| json!({"waypoint": {"address": d.address}}))
                .collect::<Vec<_>>(),
            "travelMode": "TRANSIT",
            "departureTime": departure.to_rfc3339(),
        });

        let response = self
            .client
            .post(ROUTE_MATRIX_URL)
            .header("X-Goog-Api-Key", self.api_key.expose())
            .header(
                "X-Goog-FieldMask",
                "originIndex,destinationIndex,duration,distanceMeters,condition",
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| GeoError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeoError::Api(format!("route matrix {status}: {body}")));
        }

        let elements: Vec<RouteMatrixElement> = response
            .json()
            .await
            .map_err(|e| GeoError::Http(Box::new(e)))?;

        let mut estimates = vec![None; destinations.len()];
        for element in elements {
            let Some(index) = element.destination_index else {
                continue;
            };
            if index >= estimates.len() || element.condition.as_deref() != Some("ROUTE_EXISTS") {
                continue;
            }
            if let (Some(duration), Some(meters)) =
                (element.duration_seconds(), element.distance_meters)
            {
                estimates[index] = Some(TravelEstimate {
                    minutes: duration / 60.0,
                    km: meters as f64 / 1000.0,
                });
            }
        }
        Ok(estimates)
    }

    /// Transit via the legacy Directions API, one call per destination.
    /// Used when the route matrix call fails.
    async fn directions_transit(
        &self,
        origin: &str,
        destinations: &[Destination],
        departure: DateTime<Utc>,
    ) -> GeoResult<Vec<Option<TravelEstimate>>> {
        let departure_ts = departure.timestamp().to_string();
        let mut estimates = Vec::with_capacity(destinations.len());

        for destination in destinations {
            let response = self
                .client
                .get(DIRECTIONS_URL)
                .query(&[
                    ("origin", origin),
                    ("destination", destination.address.as_str()),
                    ("mode", "transit"),
                    ("departure_time", departure_ts.as_str()),
                    ("key", self.api_key.expose()),
                ])
                .send()
                .await
                .map_err(|e| GeoError::Http(Box::new(e)))?;

            let payload: DirectionsResponse = response
                .json()
                .await
                .map_err(|e| GeoError::Http(Box::new(e)))?;

            let estimate = payload
                .routes
                .into_iter()
                .next()
                .and_then(|route| route.legs.into_iter().next())
                .map(|leg| TravelEstimate {
                    minutes: leg.duration.value as f64 / 60.0,
                    km: leg.distance.value as f64 / 1000.0,
                });
            if estimate.is_none() {
                debug!(destination = %destination.label, "no transit route found");
            }
            estimates.push(estimate);
        }
        Ok(estimates)
    }
}

/// Next weekday at 09:00 UTC, strictly after `now`.
///
/// Transit schedules are thin at night and on weekends; a fixed weekday
/// morning departure makes durations comparable across listings.
fn next_weekday_morning(now: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::Timelike;

    let mut date = now.date_naive();
    // Already past 9:00 today: start from tomorrow.
    if now.hour() >= 9 {
        date += Duration::days(1);
    }
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }
    match date.and_hms_opt(9, 0, 0) {
        Some(naive) => Utc.from_utc_datetime(&naive),
        None => now,
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<ValueField>,
    distance: Option<ValueField>,
}

impl MatrixElement {
    fn into_estimate(self) -> Option<TravelEstimate> {
        if self.status != "OK" {
            return None;
        }
        match (self.duration, self.distance) {
            (Some(duration), Some(distance)) => Some(TravelEstimate {
                minutes: duration.value as f64 / 60.0,
                km: distance.value as f64 / 1000.0,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteMatrixElement {
    #[serde(default)]
    destination_index: Option<usize>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    distance_meters: Option<i64>,
    #[serde(default)]
    condition: Option<String>,
}

impl RouteMatrixElement {
    /// Routes API durations are strings like `"1234s"`.
    fn duration_seconds(&self) -> Option<f64> {
        self.duration
            .as_deref()?
            .trim_end_matches('s')
            .parse()
            .ok()
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    duration: ValueField,
    distance: ValueField,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Place {
    #[serde(default)]
    display_name: Option<DisplayName>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DisplayName {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl MapsClient for GoogleMaps {
    async fn geocode(&self, address: &str) -> GeoResult<Option<Coordinates>> {
        let response = self
            .client
            .get(GEOCODE_URL)
            .query(&[("address", address), ("key", self.api_key.expose())])
            .send()
            .await
            .map_err(|e| GeoError::Http(Box::new(e)))?;

        let payload: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Http(Box::new(e)))?;

        match payload.status.as_str() {
            "OK" => Ok(payload.results.into_iter().next().map(|r| Coordinates {
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
            })),
            "ZERO_RESULTS" => Ok(None),
            other => Err(GeoError::Api(format!("geocoding status {other}"))),
        }
    }

    async fn travel_times(
        &self,
        origin: &str,
        destinations: &[Destination],
        mode: TravelMode,
    ) -> GeoResult<Vec<Option<TravelEstimate>>> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }

        match mode {
            TravelMode::Walking => self.distance_matrix(origin, destinations, "walking").await,
            TravelMode::Transit => {
                let departure = next_weekday_morning(Utc::now());
                match self
                    .route_matrix_transit(origin, destinations, departure)
                    .await
                {
                    Ok(estimates) => Ok(estimates),
                    Err(e) => {
                        warn!(error = %e, "route matrix failed, falling back to directions");
                        self.directions_transit(origin, destinations, departure)
                            .await
                    }
                }
            }
        }
    }

    async fn places_nearby(
        &self,
        center: Coordinates,
        radius_m: u32,
    ) -> GeoResult<Vec<NearbyPlace>> {
        let body = json!({
            "maxResultCount": MAX_NEARBY_RESULTS,
            "locationRestriction": {
                "circle": {
                    "center": {"latitude": center.lat, "longitude": center.lng},
                    "radius": radius_m as f64,
                }
            }
        });

        let response = self
            .client
            .post(PLACES_NEARBY_URL)
            .header("X-Goog-Api-Key", self.api_key.expose())
            .header(
                "X-Goog-FieldMask",
                "places.displayName,places.types,places.formattedAddress",
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| GeoError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeoError::Api(format!("places {status}: {body}")));
        }

        let payload: PlacesResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Http(Box::new(e)))?;

        Ok(payload
            .places
            .into_iter()
            .map(|place| NearbyPlace {
                name: place.display_name.map(|d| d.text).unwrap_or_default(),
                categories: place.types,
                vicinity: place.formatted_address.unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_weekday_morning_skips_weekend() {
        // Friday 2026-08-28 10:00 → Monday 09:00
        let friday = Utc.with_ymd_and_hms(2026, 8, 28, 10, 0, 0).unwrap();
        let departure = next_weekday_morning(friday);
        assert_eq!(departure, Utc.with_ymd_and_hms(2026, 8, 31, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_weekday_morning_same_day_before_nine() {
        let tuesday = Utc.with_ymd_and_hms(2026, 8, 25, 6, 30, 0).unwrap();
        let departure = next_weekday_morning(tuesday);
        assert_eq!(departure, Utc.with_ymd_and_hms(2026, 8, 25, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_geocode_response_parsing() {
        let json = r#"{
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": 53.08, "lng": 8.81}}}]
        }"#;
        let parsed: GeocodeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results[0].geometry.location.lat, 53.08);
    }

    #[test]
    fn test_matrix_element_not_ok_is_none() {
        let json = r#"{"status": "ZERO_RESULTS"}"#;
        let element: MatrixElement = serde_json::from_str(json).unwrap();
        assert!(element.into_estimate().is_none());
    }

    #[test]
    fn test_route_matrix_duration_parsing() {
        let json = r#"{
            "originIndex": 0, "destinationIndex": 1,
            "duration": "930s", "distanceMeters": 4200,
            "condition": "ROUTE_EXISTS"
        }"#;
        let element: RouteMatrixElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.duration_seconds(), Some(930.0));
        assert_eq!(element.destination_index, Some(1));
    }

    #[test]
    fn test_place_parsing_tolerates_missing_fields() {
        let json = r#"{"places": [{"displayName": {"text": "Bürgerpark"}, "types": ["park"]}]}"#;
        let parsed: PlacesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.places[0].display_name.as_ref().unwrap().text, "Bürgerpark");
        assert!(parsed.places[0].formatted_address.is_none());
    }
}
