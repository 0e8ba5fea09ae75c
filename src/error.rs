use thiserror::Error;

pub type Result<T> = std::result::Result<T, LocatorError>;

/// Failures of the external actions around the map: loading office data,
/// address lookups, device location and tile downloads.
///
/// Bad coordinates in office records are never reported through this type;
/// they are filtered out wherever coordinates are consumed.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("office data unavailable: {0}")]
    DataUnavailable(String),

    #[error("address lookup failed: {0}")]
    Geocode(String),

    #[error("unable to retrieve location: {0}")]
    Geolocation(String),

    #[error("failed to fetch tile {zoom}/{x}/{y}: {reason}")]
    Tile {
        zoom: u32,
        x: u32,
        y: u32,
        reason: String,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
