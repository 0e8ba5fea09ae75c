use log::{debug, warn};
use serde::Deserialize;

use crate::error::{LocatorError, Result};
use crate::map::map_tile::Coordinate;

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct IpLocation {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// Free-text address lookup against a Nominatim compatible service.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    country: String,
}

impl Geocoder {
    pub fn new(client: reqwest::Client, base_url: String, country: String) -> Self {
        Self {
            client,
            base_url,
            country,
        }
    }

    /// `Ok(None)` when nothing matches the address.
    pub async fn lookup(&self, address: &str) -> Result<Option<Coordinate>> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        debug!("geocoding {:?}", address);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", self.country.as_str()),
                ("q", address),
            ])
            .send()
            .await
            .map_err(|e| LocatorError::Geocode(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocatorError::Geocode(format!("{} returned {}", url, response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LocatorError::Geocode(e.to_string()))?;
        parse_places(&body)
    }
}

pub fn parse_places(body: &str) -> Result<Option<Coordinate>> {
    let places: Vec<Place> =
        serde_json::from_str(body).map_err(|e| LocatorError::Geocode(e.to_string()))?;
    let Some(place) = places.first() else {
        return Ok(None);
    };
    match (place.lat.trim().parse::<f64>(), place.lon.trim().parse::<f64>()) {
        (Ok(lat), Ok(lon)) if Coordinate::new(lat, lon).is_valid() => {
            Ok(Some(Coordinate::new(lat, lon)))
        }
        _ => {
            warn!("geocoder returned unusable coordinate {:?},{:?}", place.lat, place.lon);
            Err(LocatorError::Geocode(format!(
                "invalid coordinate {},{}",
                place.lat, place.lon
            )))
        }
    }
}

/// Approximate position of this machine, looked up from its public IP.
#[derive(Debug, Clone)]
pub struct DeviceLocator {
    client: reqwest::Client,
    url: String,
}

impl DeviceLocator {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    pub async fn locate(&self) -> Result<Coordinate> {
        debug!("locating device via {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocatorError::Geolocation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocatorError::Geolocation(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LocatorError::Geolocation(e.to_string()))?;
        parse_ip_location(&body)
    }
}

pub fn parse_ip_location(body: &str) -> Result<Coordinate> {
    let location: IpLocation =
        serde_json::from_str(body).map_err(|e| LocatorError::Geolocation(e.to_string()))?;
    if location.status != "success" {
        return Err(LocatorError::Geolocation(
            location.message.unwrap_or(location.status),
        ));
    }
    match (location.lat, location.lon) {
        (Some(lat), Some(lon)) if Coordinate::new(lat, lon).is_valid() => Ok(Coordinate::new(lat, lon)),
        _ => Err(LocatorError::Geolocation("position unavailable".to_string())),
    }
}
