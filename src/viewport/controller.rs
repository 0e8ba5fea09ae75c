use log::{debug, warn};

use crate::map::map_tile::Coordinate;
use crate::offices::office::{Office, OfficeId};

use super::bounds::{compute_bounds, BoundsConfig, CameraState, FOCUS_ZOOM};
use super::nearest::{nearest, Ranked};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// No office data yet.
    Idle,
    /// Fitted to the filtered offices.
    Overview,
    /// Centered on the selected office.
    Focused,
    /// Fitted to the user's position and the offices nearest to it.
    UserCentered,
}

/// Everything the camera is derived from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportInputs {
    pub selected: Option<OfficeId>,
    pub filtered: Vec<Office>,
    pub user_location: Option<Coordinate>,
}

impl ViewportInputs {
    pub fn selected_office(&self) -> Option<&Office> {
        let id = self.selected.as_ref()?;
        self.filtered.iter().find(|office| &office.id == id)
    }

    fn contains(&self, id: &OfficeId) -> bool {
        self.filtered.iter().any(|office| &office.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    /// First or replacement office list, already filtered.
    OfficesLoaded(Vec<Office>),
    /// The office list could not be loaded. Leaves `Idle` with no offices.
    LoadFailed,
    FilterChanged(Vec<Office>),
    Select(OfficeId),
    UserLocated(Coordinate),
    BackToOverview,
    /// The renderer finished moving to this camera. Ignored unless it is
    /// still the current one.
    CameraSettled(CameraState),
}

/// Outcome of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: ViewState,
    pub to: ViewState,
    pub camera: CameraState,
    /// The selection owner has to drop its highlighted office.
    pub selection_cleared: bool,
}

/// Derives state and camera from the inputs.
///
/// Priority: a selection that is a member of the filtered set, then a user
/// location that has not been superseded, then the filtered-set overview.
pub fn resolve(
    inputs: &ViewportInputs,
    loaded: bool,
    location_focus: bool,
    config: &BoundsConfig,
    nearest_count: usize,
) -> (ViewState, CameraState) {
    if !loaded {
        return (ViewState::Idle, config.fallback());
    }

    if let Some(office) = inputs.selected_office() {
        let camera = CameraState::Point {
            center: office.coordinate,
            zoom: FOCUS_ZOOM,
        };
        return (ViewState::Focused, camera);
    }

    if let Some(origin) = inputs.user_location.filter(|_| location_focus) {
        let mut points: Vec<Coordinate> = nearest(&origin, &inputs.filtered, nearest_count)
            .iter()
            .map(|ranked| ranked.office.coordinate)
            .collect();
        points.push(origin);
        return (ViewState::UserCentered, compute_bounds(&points, config));
    }

    let points: Vec<Coordinate> = inputs.filtered.iter().map(|office| office.coordinate).collect();
    (ViewState::Overview, compute_bounds(&points, config))
}

/// Owns the map camera and recomputes it on every event.
#[derive(Debug, Clone)]
pub struct ViewportController {
    config: BoundsConfig,
    nearest_count: usize,
    inputs: ViewportInputs,
    loaded: bool,
    location_focus: bool,
    state: ViewState,
    camera: CameraState,
    settled: bool,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(BoundsConfig::default(), super::nearest::DEFAULT_NEAREST_COUNT)
    }
}

impl ViewportController {
    pub fn new(config: BoundsConfig, nearest_count: usize) -> Self {
        let camera = config.fallback();
        Self {
            config,
            nearest_count,
            inputs: ViewportInputs::default(),
            loaded: false,
            location_focus: false,
            state: ViewState::Idle,
            camera,
            settled: false,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn inputs(&self) -> &ViewportInputs {
        &self.inputs
    }

    pub fn selected(&self) -> Option<&OfficeId> {
        self.inputs.selected.as_ref()
    }

    /// Office the renderer should mark.
    pub fn highlighted(&self) -> Option<&OfficeId> {
        match self.state {
            ViewState::Focused => self.inputs.selected.as_ref(),
            _ => None,
        }
    }

    /// Office whose details should be shown, once the camera arrived on it.
    pub fn popup(&self) -> Option<&Office> {
        match self.state {
            ViewState::Focused if self.settled => self.inputs.selected_office(),
            _ => None,
        }
    }

    pub fn user_location(&self) -> Option<Coordinate> {
        self.inputs.user_location
    }

    /// Offices the user-centered view was fitted to.
    pub fn nearest_offices(&self) -> Vec<Ranked<'_>> {
        match (self.state, self.inputs.user_location) {
            (ViewState::UserCentered, Some(origin)) => {
                nearest(&origin, &self.inputs.filtered, self.nearest_count)
            }
            _ => Vec::new(),
        }
    }

    pub fn handle(&mut self, event: ViewportEvent) -> Transition {
        let from = self.state;
        let mut selection_cleared = false;

        match event {
            ViewportEvent::OfficesLoaded(offices) | ViewportEvent::FilterChanged(offices) => {
                self.loaded = true;
                self.inputs.filtered = offices;
                selection_cleared = self.drop_stale_selection();
            }
            ViewportEvent::LoadFailed => {
                self.loaded = true;
                self.inputs.filtered.clear();
                selection_cleared = self.inputs.selected.take().is_some();
            }
            ViewportEvent::Select(id) => {
                if !self.inputs.contains(&id) {
                    warn!("ignoring selection of office {id}: not in the filtered set");
                    return self.unchanged(from);
                }
                self.inputs.selected = Some(id);
                self.location_focus = false;
            }
            ViewportEvent::UserLocated(location) => {
                if !location.is_valid() {
                    warn!("ignoring invalid user location {location}");
                    return self.unchanged(from);
                }
                self.inputs.user_location = Some(location);
                self.location_focus = true;
                selection_cleared = self.inputs.selected.take().is_some();
            }
            ViewportEvent::BackToOverview => {
                self.location_focus = false;
                selection_cleared = self.inputs.selected.take().is_some();
            }
            ViewportEvent::CameraSettled(camera) => {
                if camera == self.camera {
                    self.settled = true;
                } else {
                    debug!("ignoring settle on stale camera {:?}", camera);
                }
                return self.unchanged(from);
            }
        }

        let (state, camera) = resolve(
            &self.inputs,
            self.loaded,
            self.location_focus,
            &self.config,
            self.nearest_count,
        );
        if camera != self.camera || state != self.state {
            self.settled = false;
        }
        self.state = state;
        self.camera = camera;

        debug!("viewport {:?} -> {:?}, camera {:?}", from, state, camera);
        Transition {
            from,
            to: state,
            camera,
            selection_cleared,
        }
    }

    fn drop_stale_selection(&mut self) -> bool {
        match &self.inputs.selected {
            Some(id) if !self.inputs.contains(id) => {
                debug!("selected office {id} left the filtered set");
                self.inputs.selected = None;
                true
            }
            _ => false,
        }
    }

    fn unchanged(&self, state: ViewState) -> Transition {
        Transition {
            from: state,
            to: state,
            camera: self.camera,
            selection_cleared: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offices::office::OfficeCategory;

    fn office(id: &str, lat: f64, lon: f64) -> Office {
        Office::new(
            OfficeId::new(id),
            id,
            Coordinate::new(lat, lon),
            "",
            OfficeCategory::ProvincialOffice,
        )
    }

    fn five() -> Vec<Office> {
        vec![
            office("1", -33.9249, 18.4241),
            office("2", -26.2041, 28.0473),
            office("3", -29.8587, 31.0218),
            office("4", -29.6020, 30.3794),
            office("5", -29.0852, 26.1596),
        ]
    }

    /// Ten offices spread over the country.
    fn ten() -> Vec<Office> {
        let mut offices = five();
        offices.extend([
            office("6", -25.7479, 28.2293),  // Pretoria
            office("7", -33.9608, 25.6022),  // Gqeberha
            office("8", -23.9045, 29.4689),  // Polokwane
            office("9", -28.7282, 24.7499),  // Kimberley
            office("10", -25.4753, 30.9694), // Mbombela
        ]);
        offices
    }

    fn loaded(offices: Vec<Office>) -> ViewportController {
        let mut controller = ViewportController::default();
        controller.handle(ViewportEvent::OfficesLoaded(offices));
        controller
    }

    #[test]
    fn starts_idle_with_fallback_camera() {
        let controller = ViewportController::default();
        assert_eq!(controller.state(), ViewState::Idle);
        assert_eq!(*controller.camera(), BoundsConfig::default().fallback());
        assert!(controller.highlighted().is_none());
    }

    #[test]
    fn failed_load_still_leaves_idle() {
        let mut controller = ViewportController::default();
        let transition = controller.handle(ViewportEvent::LoadFailed);
        assert_eq!(transition.to, ViewState::Overview);
        assert_eq!(transition.camera, BoundsConfig::default().fallback());
    }

    #[test]
    fn select_then_back_to_overview() {
        let mut controller = loaded(five());
        assert_eq!(controller.state(), ViewState::Overview);
        let overview = *controller.camera();
        for office in five() {
            assert!(overview.covers(&office.coordinate));
        }

        let focused = controller.handle(ViewportEvent::Select(OfficeId::new("3")));
        assert_eq!(focused.to, ViewState::Focused);
        assert_eq!(
            focused.camera,
            CameraState::Point {
                center: Coordinate::new(-29.8587, 31.0218),
                zoom: 14
            }
        );
        assert_eq!(controller.highlighted(), Some(&OfficeId::new("3")));

        let back = controller.handle(ViewportEvent::BackToOverview);
        assert_eq!(back.to, ViewState::Overview);
        assert!(back.selection_cleared);
        assert!(controller.selected().is_none());
        assert_eq!(back.camera, overview);
    }

    #[test]
    fn filter_excluding_selection_clears_it() {
        let mut controller = loaded(five());
        controller.handle(ViewportEvent::Select(OfficeId::new("1")));

        let remaining = vec![five()[2].clone(), five()[3].clone()];
        let transition = controller.handle(ViewportEvent::FilterChanged(remaining.clone()));
        assert!(transition.selection_cleared);
        assert_eq!(transition.to, ViewState::Overview);
        let points: Vec<Coordinate> = remaining.iter().map(|o| o.coordinate).collect();
        assert_eq!(
            transition.camera,
            compute_bounds(&points, &BoundsConfig::default())
        );
    }

    #[test]
    fn filter_keeping_selection_stays_focused() {
        let mut controller = loaded(five());
        controller.handle(ViewportEvent::Select(OfficeId::new("3")));
        let transition = controller.handle(ViewportEvent::FilterChanged(five()[2..].to_vec()));
        assert!(!transition.selection_cleared);
        assert_eq!(transition.to, ViewState::Focused);
    }

    #[test]
    fn user_location_fits_nearest_three() {
        let offices = ten();
        let mut controller = loaded(offices.clone());
        let origin = Coordinate::new(-29.7256, 31.0849);
        let transition = controller.handle(ViewportEvent::UserLocated(origin));
        assert_eq!(transition.to, ViewState::UserCentered);

        let nearest_ids: Vec<String> = controller
            .nearest_offices()
            .iter()
            .map(|r| r.office.id.to_string())
            .collect();
        assert_eq!(nearest_ids, ["3", "4", "10"]);

        let camera = transition.camera;
        assert!(camera.covers(&origin));
        for office in &offices {
            let expected = nearest_ids.contains(&office.id.to_string());
            assert_eq!(camera.covers(&office.coordinate), expected, "office {}", office.id);
        }
    }

    #[test]
    fn selection_beats_location_and_back_goes_to_overview() {
        let mut controller = loaded(five());
        let overview = *controller.camera();
        controller.handle(ViewportEvent::UserLocated(Coordinate::new(-26.1, 28.0)));
        assert_eq!(controller.state(), ViewState::UserCentered);

        controller.handle(ViewportEvent::Select(OfficeId::new("1")));
        assert_eq!(controller.state(), ViewState::Focused);
        assert!(controller.user_location().is_some());

        let back = controller.handle(ViewportEvent::BackToOverview);
        assert_eq!(back.to, ViewState::Overview);
        assert_eq!(back.camera, overview);
    }

    #[test]
    fn location_replaces_selection() {
        let mut controller = loaded(five());
        controller.handle(ViewportEvent::Select(OfficeId::new("2")));
        let transition = controller.handle(ViewportEvent::UserLocated(Coordinate::new(-33.9, 18.5)));
        assert!(transition.selection_cleared);
        assert_eq!(transition.to, ViewState::UserCentered);
    }

    #[test]
    fn unknown_selection_is_ignored() {
        let mut controller = loaded(five());
        let before = *controller.camera();
        let transition = controller.handle(ViewportEvent::Select(OfficeId::new("99")));
        assert_eq!(transition.to, ViewState::Overview);
        assert_eq!(transition.camera, before);
        assert!(controller.selected().is_none());
    }

    #[test]
    fn popup_waits_for_settled_camera() {
        let mut controller = loaded(five());
        controller.handle(ViewportEvent::Select(OfficeId::new("4")));
        assert!(controller.popup().is_none());
        let camera = *controller.camera();
        controller.handle(ViewportEvent::CameraSettled(camera));
        assert_eq!(controller.popup().map(|o| o.name.as_str()), Some("4"));

        controller.handle(ViewportEvent::Select(OfficeId::new("5")));
        assert!(controller.popup().is_none());
    }

    #[test]
    fn settle_on_previous_camera_does_not_open_popup() {
        let mut controller = loaded(five());
        let overview = *controller.camera();
        controller.handle(ViewportEvent::Select(OfficeId::new("3")));

        controller.handle(ViewportEvent::CameraSettled(overview));
        assert!(controller.popup().is_none());

        let focused = *controller.camera();
        controller.handle(ViewportEvent::CameraSettled(focused));
        assert_eq!(controller.popup().map(|o| o.id.as_str()), Some("3"));
    }

    #[test]
    fn filter_change_keeps_user_centered_view() {
        let mut controller = loaded(ten());
        let origin = Coordinate::new(-29.7256, 31.0849);
        controller.handle(ViewportEvent::UserLocated(origin));

        let without: Vec<Office> = ten()
            .into_iter()
            .filter(|o| o.id.as_str() != "4" && o.id.as_str() != "10")
            .collect();
        let transition = controller.handle(ViewportEvent::FilterChanged(without));
        assert_eq!(transition.from, ViewState::UserCentered);
        assert_eq!(transition.to, ViewState::UserCentered);

        let nearest_ids: Vec<String> = controller
            .nearest_offices()
            .iter()
            .map(|r| r.office.id.to_string())
            .collect();
        assert_eq!(nearest_ids, ["3", "5", "2"]);
        assert!(transition.camera.covers(&origin));
        for office in controller.nearest_offices() {
            assert!(transition.camera.covers(&office.office.coordinate));
        }
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut controller = loaded(five());
        let origin = Coordinate::new(-29.0, 26.0);
        let first = controller.handle(ViewportEvent::UserLocated(origin));
        let second = controller.handle(ViewportEvent::UserLocated(origin));
        assert_eq!(first.camera, second.camera);
        assert_eq!(second.from, ViewState::UserCentered);
    }
}
