use log::debug;

use crate::error::{LocatorError, Result};
use crate::map::map_tile::MapTile;

/// Downloads raster tiles from a `{z}/{x}/{y}` URL template.
#[derive(Debug, Clone)]
pub struct TileRetriever {
    client: reqwest::Client,
    url_template: String,
}

impl TileRetriever {
    pub fn new(client: reqwest::Client, url_template: String) -> Self {
        Self {
            client,
            url_template,
        }
    }

    pub fn tile_url(&self, zoom: u32, x: u32, y: u32) -> String {
        self.url_template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }

    /// Asynchronously fetches a tile and decodes it into a MapTile.
    pub async fn fetch_tile(&self, zoom: u32, x: u32, y: u32) -> Result<MapTile> {
        let url = self.tile_url(zoom, x, y);
        debug!("fetching tile from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LocatorError::Tile {
                zoom,
                x,
                y,
                reason: response.status().to_string(),
            });
        }

        let bytes = response.bytes().await?;
        decode_tile(zoom, x, y, &bytes)
    }
}

/// PNG or WebP bytes into an RGBA tile.
pub fn decode_tile(zoom: u32, x: u32, y: u32, bytes: &[u8]) -> Result<MapTile> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = image.dimensions();
    Ok(MapTile::new(
        x,
        y,
        zoom,
        [width as usize, height as usize],
        image.into_raw(),
    ))
}
