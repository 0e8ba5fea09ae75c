use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Side of a raster tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Web Mercator stops being defined at the poles; tiles only cover this band.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// An axis-aligned latitude/longitude box. Never crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    south: f64, // minimum latitude
    west: f64,  // minimum longitude
    north: f64, // maximum latitude
    east: f64,  // maximum longitude
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south: south.min(north),
            west: west.min(east),
            north: north.max(south),
            east: east.max(west),
        }
    }

    /// Smallest box holding every point, or `None` for an empty slice.
    pub fn enclosing(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = GeoBounds {
            south: first.latitude,
            west: first.longitude,
            north: first.latitude,
            east: first.longitude,
        };
        for point in &points[1..] {
            bounds.south = bounds.south.min(point.latitude);
            bounds.north = bounds.north.max(point.latitude);
            bounds.west = bounds.west.min(point.longitude);
            bounds.east = bounds.east.max(point.longitude);
        }
        Some(bounds)
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    /// (latitude span, longitude span) in degrees.
    pub fn size(&self) -> (f64, f64) {
        (self.north - self.south, self.east - self.west)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.south + self.north) / 2.0,
            longitude: (self.west + self.east) / 2.0,
        }
    }

    pub fn contains(&self, other: &GeoBounds) -> bool {
        self.south <= other.south
            && self.west <= other.west
            && self.north >= other.north
            && self.east >= other.east
    }

    pub fn contains_point(&self, point: &Coordinate) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }

    /// Grows each side so neither span is below `min_span`, keeping the center.
    pub fn with_min_span(&self, min_span: f64) -> GeoBounds {
        let (lat_span, lon_span) = self.size();
        let center = self.center();
        let half_lat = lat_span.max(min_span) / 2.0;
        let half_lon = lon_span.max(min_span) / 2.0;
        GeoBounds {
            south: self.south.min(center.latitude - half_lat),
            west: self.west.min(center.longitude - half_lon),
            north: self.north.max(center.latitude + half_lat),
            east: self.east.max(center.longitude + half_lon),
        }
    }

    /// Scales both spans by `factor` around the center, clamped to the globe.
    pub fn padded(&self, factor: f64) -> GeoBounds {
        let factor = factor.max(1.0);
        let (lat_span, lon_span) = self.size();
        let center = self.center();
        let half_lat = lat_span * factor / 2.0;
        let half_lon = lon_span * factor / 2.0;
        GeoBounds {
            south: (center.latitude - half_lat).max(-90.0).min(self.south),
            west: (center.longitude - half_lon).max(-180.0).min(self.west),
            north: (center.latitude + half_lat).min(90.0).max(self.north),
            east: (center.longitude + half_lon).min(180.0).max(self.east),
        }
    }
}

/// Web Mercator world pixel position of a coordinate at a (fractional) zoom.
pub fn project(coordinate: &Coordinate, zoom: f64) -> (f64, f64) {
    let world = TILE_SIZE * 2.0_f64.powf(zoom);
    let lat = coordinate
        .latitude
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();
    let x = (coordinate.longitude + 180.0) / 360.0 * world;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: f64) -> Coordinate {
    let world = TILE_SIZE * 2.0_f64.powf(zoom);
    let longitude = x / world * 360.0 - 180.0;
    let latitude = (PI * (1.0 - 2.0 * y / world)).sinh().atan().to_degrees();
    Coordinate::new(latitude, longitude)
}

/// Convert a latitude and longitude to tile x, y coordinates for a given zoom.
/// Uses the Web Mercator projection.
pub fn latlng_to_tile_coords(lat: f64, lon: f64, zoom: u32) -> (u32, u32) {
    let n = 2_u32.pow(zoom);
    let (x, y) = project(&Coordinate::new(lat, lon), zoom as f64);
    let to_tile = |v: f64| ((v / TILE_SIZE).floor().max(0.0) as u32).min(n - 1);
    (to_tile(x), to_tile(y))
}

/// Convert tile x, y, zoom into geographical bounds (GeoBounds)
pub fn tile_coords_to_geo_bounds(x: u32, y: u32, zoom: u32) -> GeoBounds {
    let z = zoom as f64;
    let north_west = unproject(x as f64 * TILE_SIZE, y as f64 * TILE_SIZE, z);
    let south_east = unproject((x + 1) as f64 * TILE_SIZE, (y + 1) as f64 * TILE_SIZE, z);
    GeoBounds::new(
        south_east.latitude,
        north_west.longitude,
        north_west.latitude,
        south_east.longitude,
    )
}

/// A decoded raster tile, uploaded to the GPU on first draw.
pub struct MapTile {
    pub x: u32,
    pub y: u32,
    pub zoom: u32,
    size: [usize; 2],
    rgba: Vec<u8>,
    texture: Option<egui::TextureHandle>, // loaded lazily, needs the egui context
}

impl MapTile {
    pub fn new(x: u32, y: u32, zoom: u32, size: [usize; 2], rgba: Vec<u8>) -> Self {
        Self {
            x,
            y,
            zoom,
            size,
            rgba,
            texture: None,
        }
    }

    pub fn geo_bounds(&self) -> GeoBounds {
        tile_coords_to_geo_bounds(self.x, self.y, self.zoom)
    }

    pub fn texture(&mut self, ctx: &egui::Context) -> &egui::TextureHandle {
        let (x, y, zoom) = (self.x, self.y, self.zoom);
        let (size, rgba) = (self.size, &self.rgba);
        self.texture.get_or_insert_with(|| {
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba);
            ctx.load_texture(
                format!("tile_{}_{}_zoom{}", x, y, zoom),
                color_image,
                egui::TextureOptions::LINEAR,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn enclosing_box_is_order_independent() {
        let a = Coordinate::new(-33.92, 18.42);
        let b = Coordinate::new(-26.20, 28.05);
        let c = Coordinate::new(-29.86, 31.02);
        let one = GeoBounds::enclosing(&[a, b, c]).unwrap();
        let two = GeoBounds::enclosing(&[c, a, b]).unwrap();
        assert_eq!(one, two);
        assert_eq!(one.south(), -33.92);
        assert_eq!(one.north(), -26.20);
        assert_eq!(one.west(), 18.42);
        assert_eq!(one.east(), 31.02);
        assert!(GeoBounds::enclosing(&[]).is_none());
    }

    #[test]
    fn min_span_makes_degenerate_box_non_empty() {
        let point = Coordinate::new(-29.0, 26.0);
        let grown = GeoBounds::enclosing(&[point]).unwrap().with_min_span(0.01);
        let (lat_span, lon_span) = grown.size();
        assert_abs_diff_eq!(lat_span, 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(lon_span, 0.01, epsilon = 1e-12);
        assert!(grown.contains_point(&point));
    }

    #[test]
    fn padding_contains_original() {
        let bounds = GeoBounds::new(-34.0, 18.0, -26.0, 31.0);
        let padded = bounds.padded(1.2);
        assert!(padded.contains(&bounds));
        let (lat_span, lon_span) = padded.size();
        assert_abs_diff_eq!(lat_span, 8.0 * 1.2, epsilon = 1e-9);
        assert_abs_diff_eq!(lon_span, 13.0 * 1.2, epsilon = 1e-9);
        assert_abs_diff_eq!(padded.center().latitude(), -30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(padded.center().longitude(), 24.5, epsilon = 1e-9);
    }

    #[test]
    fn projection_round_trips() {
        let durban = Coordinate::new(-29.8587, 31.0218);
        let (x, y) = project(&durban, 7.5);
        let back = unproject(x, y, 7.5);
        assert_abs_diff_eq!(back.latitude(), durban.latitude(), epsilon = 1e-9);
        assert_abs_diff_eq!(back.longitude(), durban.longitude(), epsilon = 1e-9);
    }

    #[test]
    fn tile_bounds_contain_their_points() {
        let cape_town = Coordinate::new(-33.9249, 18.4241);
        let (x, y) = latlng_to_tile_coords(cape_town.latitude(), cape_town.longitude(), 10);
        assert!(tile_coords_to_geo_bounds(x, y, 10).contains_point(&cape_town));
        assert_eq!(latlng_to_tile_coords(0.0, 0.0, 0), (0, 0));
    }

    #[test]
    fn validity() {
        assert!(Coordinate::new(-30.0, 22.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 22.0).is_valid());
        assert!(!Coordinate::new(-91.0, 22.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
    }
}
