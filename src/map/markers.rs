use egui::Color32;
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::offices::office::OfficeCategory;

/// Pointer distance in pixels that still counts as a marker click.
pub const HIT_RADIUS: f64 = 14.0;

type Marker = GeomWithData<[f64; 2], usize>;

/// Screen positions of the markers drawn this frame, for hit-testing.
pub struct MarkerIndex {
    tree: RTree<Marker>,
}

impl MarkerIndex {
    /// `positions` pairs an item index with its screen position.
    pub fn new(positions: impl IntoIterator<Item = (usize, [f64; 2])>) -> Self {
        let markers = positions
            .into_iter()
            .map(|(index, at)| GeomWithData::new(at, index))
            .collect();
        Self {
            tree: RTree::bulk_load(markers),
        }
    }

    /// Closest marker within `radius` of `at`.
    pub fn hit(&self, at: [f64; 2], radius: f64) -> Option<usize> {
        let marker = self.tree.nearest_neighbor(&at)?;
        let [x, y] = *marker.geom();
        let distance_2 = (x - at[0]).powi(2) + (y - at[1]).powi(2);
        (distance_2 <= radius * radius).then_some(marker.data)
    }
}

pub fn category_color(category: OfficeCategory) -> Color32 {
    match category {
        OfficeCategory::MainOffice => Color32::from_rgb(0xff, 0x47, 0x57),
        OfficeCategory::ProvincialOffice => Color32::from_rgb(0x37, 0x42, 0xfa),
        OfficeCategory::MpOffice => Color32::from_rgb(0x2e, 0xd5, 0x73),
        OfficeCategory::BranchOffice => Color32::from_rgb(0xff, 0xa5, 0x02),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_closest_marker_in_radius() {
        let index = MarkerIndex::new([(0, [10.0, 10.0]), (1, [40.0, 10.0]), (2, [12.0, 30.0])]);
        assert_eq!(index.hit([11.0, 11.0], HIT_RADIUS), Some(0));
        assert_eq!(index.hit([38.0, 14.0], HIT_RADIUS), Some(1));
        assert_eq!(index.hit([200.0, 200.0], HIT_RADIUS), None);
    }

    #[test]
    fn empty_index_hits_nothing() {
        let index = MarkerIndex::new(std::iter::empty());
        assert_eq!(index.hit([0.0, 0.0], HIT_RADIUS), None);
    }
}
