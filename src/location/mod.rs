//! Geocoding and timezone lookup.
//!
//! City text goes to Nominatim (first hit wins), coordinates go to
//! TimeZoneDB for an IANA zone name. Both are network black boxes behind the
//! `Resolver` trait so conversation tests can stub them.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::BotError;

/// Best match for a free-text city query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedCity {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// None means no match for the query.
    async fn geocode(&self, city: &str) -> Result<Option<GeocodedCity>, BotError>;

    /// IANA zone name for the coordinates.
    async fn timezone_for(&self, latitude: f64, longitude: f64) -> Result<String, BotError>;
}

// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct TimezoneDbResponse {
    #[serde(rename = "zoneName")]
    zone_name: Option<String>,
}

pub struct OpenStreetMapResolver {
    client: reqwest::Client,
    timezonedb_api_key: Option<String>,
}

impl OpenStreetMapResolver {
    pub fn new(client: reqwest::Client, timezonedb_api_key: Option<String>) -> Self {
        Self { client, timezonedb_api_key }
    }
}

#[async_trait]
impl Resolver for OpenStreetMapResolver {
    async fn geocode(&self, city: &str) -> Result<Option<GeocodedCity>, BotError> {
        let places: Vec<NominatimPlace> = self
            .client
            .get("https://nominatim.openstreetmap.org/search")
            .query(&[("format", "json"), ("q", city)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let (Ok(latitude), Ok(longitude)) = (place.lat.parse(), place.lon.parse()) else {
            log::warn!("geocoder returned unparseable coordinates for {:?}", city);
            return Ok(None);
        };

        Ok(Some(GeocodedCity { latitude, longitude, display_name: place.display_name }))
    }

    async fn timezone_for(&self, latitude: f64, longitude: f64) -> Result<String, BotError> {
        let key = self
            .timezonedb_api_key
            .as_deref()
            .ok_or(BotError::Config("TIMEZONEDB_API_KEY"))?;

        let lat = latitude.to_string();
        let lng = longitude.to_string();
        let response: TimezoneDbResponse = self
            .client
            .get("http://api.timezonedb.com/v2.1/get-time-zone")
            .query(&[
                ("key", key),
                ("format", "json"),
                ("by", "position"),
                ("lat", lat.as_str()),
                ("lng", lng.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Fall back to UTC rather than failing the whole conversation step.
        Ok(response.zone_name.unwrap_or_else(|| {
            log::warn!("timezonedb returned no zone for {}, {}", latitude, longitude);
            "UTC".to_string()
        }))
    }
}
