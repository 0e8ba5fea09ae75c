use serde::{Deserialize, Serialize};

use crate::map::map_tile::{Coordinate, GeoBounds};

/// Zoom used when the camera focuses a single selected office.
pub const FOCUS_ZOOM: u8 = 14;

/// (padded span upper bound in degrees, zoom), checked top to bottom.
const SPAN_ZOOM_TABLE: [(f64, u8); 5] = [(0.01, 13), (0.05, 11), (0.1, 9), (0.5, 7), (2.0, 6)];
const WIDEST_ZOOM: u8 = 5;

/// What the map should show. Exactly one mode at a time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraState {
    Point { center: Coordinate, zoom: u8 },
    /// Region to fit into the view. Padding is already included.
    Bounds(GeoBounds),
}

impl CameraState {
    pub fn center(&self) -> Coordinate {
        match self {
            CameraState::Point { center, .. } => *center,
            CameraState::Bounds(bounds) => bounds.center(),
        }
    }

    /// Whether the region shown is guaranteed to include `point`. Point mode
    /// only promises its center.
    pub fn covers(&self, point: &Coordinate) -> bool {
        match self {
            CameraState::Point { center, .. } => center == point,
            CameraState::Bounds(bounds) => bounds.contains_point(point),
        }
    }

    /// Center and zoom for renderers that cannot fit a region themselves.
    pub fn to_center_zoom(&self) -> (Coordinate, u8) {
        match self {
            CameraState::Point { center, zoom } => (*center, *zoom),
            CameraState::Bounds(bounds) => {
                let (lat_span, lon_span) = bounds.size();
                // already padded
                (bounds.center(), zoom_for_span(lat_span.max(lon_span), 1.0))
            }
        }
    }
}

/// Picks a zoom from the span table after inflating `span` by `padding`.
pub fn zoom_for_span(span: f64, padding: f64) -> u8 {
    let padded = span * padding;
    SPAN_ZOOM_TABLE
        .iter()
        .find(|(limit, _)| padded < *limit)
        .map(|(_, zoom)| *zoom)
        .unwrap_or(WIDEST_ZOOM)
}

/// Tunables for [`compute_bounds`]. The defaults describe South Africa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsConfig {
    /// Points outside this box are treated as bad data.
    pub region: GeoBounds,
    pub fallback_center: Coordinate,
    pub fallback_zoom: u8,
    pub single_zoom: u8,
    /// Smallest span in degrees of a fitted region.
    pub min_span: f64,
    pub padding: f64,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            region: GeoBounds::new(-35.0, 16.0, -22.0, 33.0),
            fallback_center: Coordinate::new(-30.5595, 22.9375),
            fallback_zoom: 6,
            single_zoom: 12,
            min_span: 0.01,
            padding: 1.2,
        }
    }
}

impl BoundsConfig {
    pub fn fallback(&self) -> CameraState {
        CameraState::Point {
            center: self.fallback_center,
            zoom: self.fallback_zoom,
        }
    }

    pub fn accepts(&self, point: &Coordinate) -> bool {
        point.is_valid() && self.region.contains_point(point)
    }
}

/// Camera that shows every acceptable point.
///
/// No points gives the configured fallback, one distinct point gives point
/// mode at `single_zoom`, anything else a padded bounds region. The result
/// only depends on the set of points, not on their order or repetition.
pub fn compute_bounds(points: &[Coordinate], config: &BoundsConfig) -> CameraState {
    let accepted: Vec<Coordinate> = points.iter().copied().filter(|p| config.accepts(p)).collect();

    let Some(first) = accepted.first() else {
        return config.fallback();
    };
    if accepted.iter().all(|p| p == first) {
        return CameraState::Point {
            center: *first,
            zoom: config.single_zoom,
        };
    }

    match GeoBounds::enclosing(&accepted) {
        Some(bounds) => CameraState::Bounds(bounds.with_min_span(config.min_span).padded(config.padding)),
        None => config.fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country() -> Vec<Coordinate> {
        vec![
            Coordinate::new(-33.9249, 18.4241), // Cape Town
            Coordinate::new(-26.2041, 28.0473), // Johannesburg
            Coordinate::new(-29.8587, 31.0218), // Durban
            Coordinate::new(-29.6020, 30.3794), // Pietermaritzburg
            Coordinate::new(-29.0852, 26.1596), // Bloemfontein
        ]
    }

    #[test]
    fn empty_input_is_fallback() {
        let config = BoundsConfig::default();
        assert_eq!(
            compute_bounds(&[], &config),
            CameraState::Point {
                center: Coordinate::new(-30.5595, 22.9375),
                zoom: 6
            }
        );
    }

    #[test]
    fn out_of_region_points_are_ignored() {
        let config = BoundsConfig::default();
        let points = [
            Coordinate::new(51.5, -0.12),
            Coordinate::new(f64::NAN, 25.0),
            Coordinate::new(-30.0, f64::INFINITY),
        ];
        assert_eq!(compute_bounds(&points, &config), config.fallback());
    }

    #[test]
    fn single_point_is_point_mode() {
        let config = BoundsConfig::default();
        let durban = Coordinate::new(-29.8587, 31.0218);
        assert_eq!(
            compute_bounds(&[durban, Coordinate::new(10.0, 10.0)], &config),
            CameraState::Point {
                center: durban,
                zoom: 12
            }
        );
    }

    #[test]
    fn region_covers_every_point() {
        let config = BoundsConfig::default();
        let points = country();
        let camera = compute_bounds(&points, &config);
        assert!(matches!(camera, CameraState::Bounds(_)));
        for point in &points {
            assert!(camera.covers(point), "{point} not covered");
        }
        if let CameraState::Bounds(region) = camera {
            let unpadded = GeoBounds::enclosing(&points).unwrap();
            assert!(region.contains(&unpadded));
        }
    }

    #[test]
    fn order_and_duplicates_do_not_matter() {
        let config = BoundsConfig::default();
        let points = country();
        let mut shuffled = points.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);
        shuffled.push(points[1]);
        shuffled.push(points[3]);
        assert_eq!(compute_bounds(&points, &config), compute_bounds(&shuffled, &config));

        let single = [points[0]];
        let doubled = [points[0], points[0]];
        assert_eq!(compute_bounds(&single, &config), compute_bounds(&doubled, &config));
    }

    #[test]
    fn collinear_points_get_non_zero_area() {
        let config = BoundsConfig::default();
        let points = [Coordinate::new(-30.0, 24.0), Coordinate::new(-30.0, 25.0)];
        match compute_bounds(&points, &config) {
            CameraState::Bounds(region) => {
                let (lat_span, lon_span) = region.size();
                assert!(lat_span >= config.min_span);
                assert!(lon_span > 1.0);
            }
            other => panic!("expected bounds, got {other:?}"),
        }
    }

    #[test]
    fn span_table() {
        assert_eq!(zoom_for_span(0.005, 1.2), 13);
        assert_eq!(zoom_for_span(0.03, 1.2), 11);
        assert_eq!(zoom_for_span(0.07, 1.2), 9);
        assert_eq!(zoom_for_span(0.3, 1.2), 7);
        assert_eq!(zoom_for_span(1.5, 1.2), 6);
        assert_eq!(zoom_for_span(1.9, 1.2), 5);
        assert_eq!(zoom_for_span(13.0, 1.2), 5);
    }

    #[test]
    fn bounds_convert_to_center_and_zoom() {
        let config = BoundsConfig::default();
        let camera = compute_bounds(&country(), &config);
        let (center, zoom) = camera.to_center_zoom();
        assert_eq!(center, camera.center());
        assert_eq!(zoom, 5);
    }
}
