use egui::{pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Response, Sense, Stroke, Ui, Vec2};
use lru::LruCache;

use super::map_tile::{project, unproject, Coordinate, MapTile, TILE_SIZE};
use super::markers::{category_color, MarkerIndex, HIT_RADIUS};
use crate::offices::office::{Office, OfficeId};
use crate::viewport::bounds::CameraState;

/// (zoom, x, y)
pub type TileKey = (u32, u32, u32);

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Approach rate of the camera animation, per second.
const EASE_RATE: f64 = 6.0;

const ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Camera of the map widget between frames. Lives in egui's temporary memory.
#[derive(Clone, Default)]
pub struct MapState {
    view: Option<(Coordinate, f64)>,
    camera: Option<CameraState>,
    settled: bool,
    detached: bool, // user panned or zoomed away from the camera
}

impl MapState {
    pub fn load(ctx: &egui::Context, id: egui::Id) -> Self {
        ctx.data_mut(|d| d.get_temp::<Self>(id).unwrap_or_default())
    }

    pub fn store(self, ctx: &egui::Context, id: egui::Id) {
        ctx.data_mut(|d| d.insert_temp(id, self));
    }
}

/// Center and fractional zoom that show `camera` in a viewport of `size`
/// pixels, keeping `padding` pixels free on every side.
pub fn fit_camera(camera: &CameraState, size: Vec2, padding: f32) -> (Coordinate, f64) {
    match camera {
        CameraState::Point { center, zoom } => (*center, (*zoom as f64).clamp(MIN_ZOOM, MAX_ZOOM)),
        CameraState::Bounds(bounds) => {
            let (west, north) = project(&Coordinate::new(bounds.north(), bounds.west()), 0.0);
            let (east, south) = project(&Coordinate::new(bounds.south(), bounds.east()), 0.0);
            let width = (east - west).abs().max(f64::EPSILON);
            let height = (south - north).abs().max(f64::EPSILON);
            let available_w = (size.x - 2.0 * padding).max(1.0) as f64;
            let available_h = (size.y - 2.0 * padding).max(1.0) as f64;
            let zoom = (available_w / width)
                .log2()
                .min((available_h / height).log2())
                .clamp(MIN_ZOOM, MAX_ZOOM);
            let center = unproject((west + east) / 2.0, (north + south) / 2.0, 0.0);
            (center, zoom)
        }
    }
}

/// Moves `current` toward `target` by `fraction`. Snaps and reports arrival
/// once the remaining offset is below half a pixel.
pub fn ease(current: (Coordinate, f64), target: (Coordinate, f64), fraction: f64) -> ((Coordinate, f64), bool) {
    let (from, from_zoom) = current;
    let (to, to_zoom) = target;
    let (fx, fy) = project(&from, from_zoom);
    let (tx, ty) = project(&to, from_zoom);
    if (fx - tx).hypot(fy - ty) < 0.5 && (from_zoom - to_zoom).abs() < 0.01 {
        return (target, true);
    }
    let t = fraction.clamp(0.0, 1.0);
    let center = Coordinate::new(
        from.latitude() + (to.latitude() - from.latitude()) * t,
        from.longitude() + (to.longitude() - from.longitude()) * t,
    );
    ((center, from_zoom + (to_zoom - from_zoom) * t), false)
}

/// What happened on the map this frame.
pub struct MapOutput {
    pub response: Response,
    pub clicked: Option<OfficeId>,
    /// The camera target that was reached this frame, reported once per target.
    pub settled: Option<CameraState>,
    pub back: bool,
}

/// Raster map showing a [`CameraState`] with office markers on top.
pub struct Map<'a> {
    id: egui::Id,
    tile_cache: &'a mut LruCache<TileKey, MapTile>,
    missing_tiles: &'a mut Vec<TileKey>,
    camera: &'a CameraState,
    offices: &'a [Office],
    highlighted: Option<&'a OfficeId>,
    popup: Option<&'a Office>,
    user_location: Option<Coordinate>,
    padding: f32,
    back_button: bool,
}

impl<'a> Map<'a> {
    pub fn new(
        id_source: impl std::hash::Hash,
        tile_cache: &'a mut LruCache<TileKey, MapTile>,
        missing_tiles: &'a mut Vec<TileKey>,
        camera: &'a CameraState,
    ) -> Self {
        Self {
            id: egui::Id::new(id_source),
            tile_cache,
            missing_tiles,
            camera,
            offices: &[],
            highlighted: None,
            popup: None,
            user_location: None,
            padding: 40.0,
            back_button: false,
        }
    }

    pub fn offices(mut self, offices: &'a [Office]) -> Self {
        self.offices = offices;
        self
    }

    pub fn highlighted(mut self, id: Option<&'a OfficeId>) -> Self {
        self.highlighted = id;
        self
    }

    pub fn popup(mut self, office: Option<&'a Office>) -> Self {
        self.popup = office;
        self
    }

    pub fn user_location(mut self, location: Option<Coordinate>) -> Self {
        self.user_location = location;
        self
    }

    pub fn back_button(mut self, show: bool) -> Self {
        self.back_button = show;
        self
    }

    pub fn show(mut self, ui: &mut Ui) -> MapOutput {
        let mut state = MapState::load(ui.ctx(), self.id);

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let target = fit_camera(self.camera, rect.size(), self.padding);

        if state.camera != Some(*self.camera) {
            state.camera = Some(*self.camera);
            state.settled = false;
            state.detached = false;
        }
        let (mut center, mut zoom) = state.view.unwrap_or(target);
        let mut settled = false;

        // Handle interactions
        if response.dragged() {
            let delta = response.drag_delta();
            if delta != Vec2::ZERO {
                let (x, y) = project(&center, zoom);
                center = unproject(x - delta.x as f64, y - delta.y as f64, zoom);
                state.detached = true;
            }
        }
        if response.hovered() {
            let pinch = ui.input(|i| i.zoom_delta());
            let scroll = ui.input(|i| i.smooth_scroll_delta).y;
            if (pinch - 1.0).abs() > f32::EPSILON {
                zoom = (zoom + (pinch as f64).log2()).clamp(MIN_ZOOM, MAX_ZOOM);
                state.detached = true;
            } else if scroll.abs() > f32::EPSILON {
                // Normalize scroll further using tanh
                zoom = (zoom + (scroll / 10.0).tanh() as f64 * 0.5).clamp(MIN_ZOOM, MAX_ZOOM);
                state.detached = true;
            }
        }

        if state.detached {
            if !state.settled {
                state.settled = true;
                settled = true;
            }
        } else {
            let dt = ui.input(|i| i.stable_dt).min(0.1) as f64;
            let fraction = 1.0 - (-EASE_RATE * dt).exp();
            let (next, arrived) = ease((center, zoom), target, fraction);
            (center, zoom) = next;
            if arrived {
                if !state.settled {
                    state.settled = true;
                    settled = true;
                }
            } else {
                ui.ctx().request_repaint();
            }
        }

        let painter = ui.painter().with_clip_rect(rect);
        painter.rect_filled(rect, 0.0, Color32::from_gray(220));
        self.paint_tiles(ui.ctx(), &painter, rect, center, zoom);

        let to_screen = |coordinate: &Coordinate| -> Pos2 {
            let (cx, cy) = project(&center, zoom);
            let (x, y) = project(coordinate, zoom);
            rect.center() + vec2((x - cx) as f32, (y - cy) as f32)
        };

        let mut positions = Vec::with_capacity(self.offices.len());
        for (index, office) in self.offices.iter().enumerate() {
            if !office.has_valid_coordinate() {
                continue;
            }
            let at = to_screen(&office.coordinate);
            let highlighted = self.highlighted == Some(&office.id);
            let radius = if highlighted { 10.0 } else { 7.0 };
            painter.circle(at, radius, category_color(office.category), Stroke::new(2.0, Color32::WHITE));
            if highlighted {
                painter.circle_stroke(at, radius + 4.0, Stroke::new(3.0, Color32::from_rgb(255, 200, 0)));
            }
            positions.push((index, [at.x as f64, at.y as f64]));
        }

        if let Some(location) = self.user_location.filter(|l| l.is_valid()) {
            let at = to_screen(&location);
            painter.circle_filled(at, 14.0, Color32::from_rgba_unmultiplied(30, 136, 229, 60));
            painter.circle(at, 6.0, Color32::from_rgb(30, 136, 229), Stroke::new(2.0, Color32::WHITE));
        }

        if let Some(office) = self.popup {
            paint_popup(&painter, rect, to_screen(&office.coordinate), office);
        }

        painter.text(
            rect.right_bottom() - vec2(4.0, 2.0),
            Align2::RIGHT_BOTTOM,
            ATTRIBUTION,
            FontId::proportional(11.0),
            Color32::from_gray(60),
        );

        let mut clicked = None;
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let index = MarkerIndex::new(positions);
                clicked = index
                    .hit([pos.x as f64, pos.y as f64], HIT_RADIUS)
                    .map(|i| self.offices[i].id.clone());
            }
        }

        let mut back = false;
        if self.back_button {
            let button_rect = Rect::from_min_size(rect.left_top() + vec2(12.0, 12.0), vec2(80.0, 28.0));
            back = ui.put(button_rect, egui::Button::new("← Back")).clicked();
        }

        state.view = Some((center, zoom));
        state.store(ui.ctx(), self.id);

        MapOutput {
            response,
            clicked,
            settled: settled.then_some(*self.camera),
            back,
        }
    }

    fn paint_tiles(&mut self, ctx: &egui::Context, painter: &egui::Painter, rect: Rect, center: Coordinate, zoom: f64) {
        let z = zoom.floor().clamp(MIN_ZOOM, MAX_ZOOM) as u32;
        let scale = 2.0_f64.powf(zoom - z as f64);
        let n = 2_i64.pow(z);
        let (cx, cy) = project(&center, z as f64);

        let half_w = rect.width() as f64 / 2.0 / scale;
        let half_h = rect.height() as f64 / 2.0 / scale;
        let min_x = ((cx - half_w) / TILE_SIZE).floor() as i64;
        let max_x = ((cx + half_w) / TILE_SIZE).floor() as i64;
        let min_y = (((cy - half_h) / TILE_SIZE).floor() as i64).max(0);
        let max_y = (((cy + half_h) / TILE_SIZE).floor() as i64).min(n - 1);

        let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
        let side = (TILE_SIZE * scale) as f32;

        for ty in min_y..=max_y {
            for tx in min_x..=max_x {
                let top_left = rect.center()
                    + vec2(
                        ((tx as f64 * TILE_SIZE - cx) * scale) as f32,
                        ((ty as f64 * TILE_SIZE - cy) * scale) as f32,
                    );
                let tile_rect = Rect::from_min_size(top_left, vec2(side, side));
                // Longitude wraps around, latitude does not.
                let key = (z, tx.rem_euclid(n) as u32, ty as u32);

                if let Some(tile) = self.tile_cache.get_mut(&key) {
                    let texture = tile.texture(ctx);
                    painter.image(texture.id(), tile_rect, uv, Color32::WHITE);
                } else {
                    self.missing_tiles.push(key);
                    painter.rect_stroke(tile_rect, 0.0, Stroke::new(1.0, Color32::from_gray(200)));
                }
            }
        }
    }
}

fn paint_popup(painter: &egui::Painter, bounds: Rect, anchor: Pos2, office: &Office) {
    let mut lines = vec![office.name.clone(), format!("Type: {}", office.category)];
    if let Some(province) = &office.province {
        lines.push(format!("Province: {province}"));
    }
    if let Some(mp) = &office.representative {
        match &office.party {
            Some(party) => lines.push(format!("MP: {} ({party})", mp.name)),
            None => lines.push(format!("MP: {}", mp.name)),
        }
    }
    lines.push(format!("Address: {}", office.address));
    if let Some(admin) = &office.admin {
        if let Some(person) = &admin.person {
            lines.push(format!("Administrator: {person}"));
        }
        if let Some(phone) = &admin.phone {
            lines.push(format!("Phone: {phone}"));
        }
        if let Some(email) = &admin.email {
            lines.push(format!("Email: {email}"));
        }
    }
    lines.push(format!("Coordinates: {}", office.coordinate));

    let galley = painter.layout(lines.join("\n"), FontId::proportional(13.0), Color32::from_gray(20), 280.0);
    let size = galley.size() + vec2(16.0, 12.0);
    let mut popup = Rect::from_min_size(anchor - vec2(size.x / 2.0, size.y + 18.0), size);

    // Keep inside the map.
    let shift = vec2(
        (bounds.left() + 4.0 - popup.left()).max(0.0) - (popup.right() - bounds.right() + 4.0).max(0.0),
        (bounds.top() + 4.0 - popup.top()).max(0.0),
    );
    popup = popup.translate(shift);

    painter.rect_filled(popup, 6.0, Color32::WHITE);
    painter.rect_stroke(popup, 6.0, Stroke::new(1.0, Color32::from_gray(160)));
    painter.galley(popup.min + vec2(8.0, 6.0), galley, Color32::from_gray(20));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::map_tile::GeoBounds;
    use approx::assert_abs_diff_eq;

    #[test]
    fn point_camera_passes_through() {
        let center = Coordinate::new(-29.8587, 31.0218);
        let (c, z) = fit_camera(&CameraState::Point { center, zoom: 14 }, vec2(800.0, 600.0), 40.0);
        assert_eq!(c, center);
        assert_eq!(z, 14.0);
    }

    #[test]
    fn fitted_bounds_fit_inside_viewport() {
        let bounds = GeoBounds::new(-34.0, 18.0, -26.0, 31.0);
        let size = vec2(800.0, 600.0);
        let (center, zoom) = fit_camera(&CameraState::Bounds(bounds), size, 40.0);

        let (cx, cy) = project(&center, zoom);
        for corner in [
            Coordinate::new(bounds.north(), bounds.west()),
            Coordinate::new(bounds.south(), bounds.east()),
        ] {
            let (x, y) = project(&corner, zoom);
            assert!((x - cx).abs() <= 360.0 + 1e-6, "x offset {}", x - cx);
            assert!((y - cy).abs() <= 260.0 + 1e-6, "y offset {}", y - cy);
        }
        assert!(zoom > 4.0 && zoom < 7.0, "zoom {zoom}");
    }

    #[test]
    fn easing_converges_and_reports_arrival() {
        let target = (Coordinate::new(-29.0, 26.0), 10.0);
        let mut current = (Coordinate::new(-33.0, 18.0), 6.0);
        let mut arrived = false;
        for _ in 0..500 {
            let (next, done) = ease(current, target, 0.1);
            current = next;
            if done {
                arrived = true;
                break;
            }
        }
        assert!(arrived);
        assert_eq!(current, target);

        let (same, done) = ease(target, target, 0.5);
        assert!(done);
        assert_abs_diff_eq!(same.1, 10.0);
    }
}
