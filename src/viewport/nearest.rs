use crate::map::map_tile::Coordinate;
use crate::offices::office::Office;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// How many offices the "near me" action shows.
pub const DEFAULT_NEAREST_COUNT: usize = 3;

/// Great-circle distance in kilometres.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();
    let lat_a = a.latitude().to_radians();
    let lat_b = b.latitude().to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked<'a> {
    pub office: &'a Office,
    pub distance_km: f64,
}

/// Offices with a usable coordinate, closest to `origin` first. Equal
/// distances keep their input order.
pub fn rank<'a>(origin: &Coordinate, offices: &'a [Office]) -> Vec<Ranked<'a>> {
    let mut ranked: Vec<Ranked<'a>> = offices
        .iter()
        .filter(|office| office.has_valid_coordinate())
        .map(|office| Ranked {
            office,
            distance_km: haversine_km(origin, &office.coordinate),
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

/// The `k` closest offices to `origin`, closest first.
pub fn nearest<'a>(origin: &Coordinate, offices: &'a [Office], k: usize) -> Vec<Ranked<'a>> {
    if k == 0 || !origin.is_valid() {
        return Vec::new();
    }
    let mut ranked = rank(origin, offices);
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offices::office::{OfficeCategory, OfficeId};
    use approx::assert_relative_eq;

    fn office(id: &str, lat: f64, lon: f64) -> Office {
        Office::new(
            OfficeId::new(id),
            id,
            Coordinate::new(lat, lon),
            "",
            OfficeCategory::BranchOffice,
        )
    }

    fn offices() -> Vec<Office> {
        vec![
            office("cape-town", -33.9249, 18.4241),
            office("johannesburg", -26.2041, 28.0473),
            office("durban", -29.8587, 31.0218),
            office("pietermaritzburg", -29.6020, 30.3794),
            office("bloemfontein", -29.0852, 26.1596),
        ]
    }

    fn ids(ranked: &[Ranked<'_>]) -> Vec<String> {
        ranked.iter().map(|r| r.office.id.to_string()).collect()
    }

    #[test]
    fn known_distance() {
        let berlin = Coordinate::new(52.5200, 13.4050);
        let paris = Coordinate::new(48.8566, 2.3522);
        assert_relative_eq!(haversine_km(&berlin, &paris), 877.5, max_relative = 0.005);
        assert_eq!(haversine_km(&paris, &paris), 0.0);
    }

    #[test]
    fn closest_first() {
        let offices = offices();
        let umhlanga = Coordinate::new(-29.7256, 31.0849);
        let found = nearest(&umhlanga, &offices, 3);
        assert_eq!(ids(&found), ["durban", "pietermaritzburg", "bloemfontein"]);
        assert!(found.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn count_is_min_of_k_and_valid() {
        let mut offices = offices();
        offices.push(office("broken", f64::NAN, 28.0));
        offices.push(office("off-globe", -95.0, 28.0));
        let origin = Coordinate::new(-30.0, 25.0);
        assert!(nearest(&origin, &offices, 0).is_empty());
        assert_eq!(nearest(&origin, &offices, 2).len(), 2);
        assert_eq!(nearest(&origin, &offices, 100).len(), 5);
        assert_eq!(nearest(&origin, &[], 3).len(), 0);
    }

    #[test]
    fn ties_keep_input_order() {
        let offices = vec![
            office("first", -30.0, 25.0),
            office("second", -30.0, 25.0),
            office("third", -30.0, 25.0),
        ];
        let found = nearest(&Coordinate::new(-31.0, 25.0), &offices, 3);
        assert_eq!(ids(&found), ["first", "second", "third"]);
    }

    #[test]
    fn invalid_origin_finds_nothing() {
        let offices = offices();
        assert!(nearest(&Coordinate::new(f64::NAN, 0.0), &offices, 3).is_empty());
    }
}
