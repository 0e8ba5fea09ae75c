//! Single-threaded event processing for the office map.
//!
//! Every input (data load, list filter, clicks, location lookups, renderer
//! callbacks) arrives as one [`AppEvent`] and is applied in full before the
//! next one. Work that has to leave the UI thread is returned as [`Command`]s.

use std::fmt;

use log::{info, warn};

use crate::config::StartupTrigger;
use crate::error::LocatorError;
use crate::map::map_tile::Coordinate;
use crate::offices::filter::{Facets, OfficeFilter};
use crate::offices::office::{Office, OfficeId};
use crate::viewport::bounds::{BoundsConfig, CameraState};
use crate::viewport::controller::{ViewportController, ViewportEvent};

#[derive(Debug)]
pub enum AppEvent {
    OfficesFetched(Result<Vec<Office>, LocatorError>),
    RetryLoad,
    FilterChanged(OfficeFilter),
    OfficeClicked(OfficeId),
    NearMeRequested,
    AddressSearchRequested(String),
    DeviceLocated(Result<Coordinate, LocatorError>),
    AddressResolved {
        query: String,
        result: Result<Option<Coordinate>, LocatorError>,
    },
    BackToOverview,
    CameraSettled(CameraState),
}

/// Asynchronous work for the caller to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchOffices,
    LocateDevice,
    Geocode(String),
}

/// Something the user has to be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    DataUnavailable,
    AddressNotFound(String),
    LookupFailed(String),
    LocationUnavailable(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DataUnavailable => f.write_str("Failed to load office data"),
            Notice::AddressNotFound(query) => write!(f, "Address not found: {query}"),
            Notice::LookupFailed(reason) => write!(f, "Address lookup failed: {reason}"),
            Notice::LocationUnavailable(reason) => {
                write!(f, "Unable to retrieve your location: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed,
}

pub struct Session {
    offices: Vec<Office>,
    filter: OfficeFilter,
    facets: Facets,
    viewport: ViewportController,
    load_state: LoadState,
    startup: Option<StartupTrigger>,
    pending_lookup: bool,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new(config: BoundsConfig, nearest_count: usize, startup: Option<StartupTrigger>) -> Self {
        Self {
            offices: Vec::new(),
            filter: OfficeFilter::default(),
            facets: Facets::default(),
            viewport: ViewportController::new(config, nearest_count),
            load_state: LoadState::Loading,
            startup,
            pending_lookup: false,
            notices: Vec::new(),
        }
    }

    /// Commands to issue before any event arrived.
    pub fn start(&self) -> Vec<Command> {
        vec![Command::FetchOffices]
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn filtered(&self) -> &[Office] {
        &self.viewport.inputs().filtered
    }

    pub fn filter(&self) -> &OfficeFilter {
        &self.filter
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// A location or address lookup is in flight.
    pub fn lookup_pending(&self) -> bool {
        self.pending_lookup
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn handle(&mut self, event: AppEvent) -> Vec<Command> {
        match event {
            AppEvent::OfficesFetched(Ok(offices)) => {
                info!("{} offices available", offices.len());
                self.offices = offices;
                self.facets = Facets::of(&self.offices);
                self.load_state = LoadState::Loaded;
                let filtered = self.filter.apply(&self.offices);
                self.viewport.handle(ViewportEvent::OfficesLoaded(filtered));
                self.startup_commands()
            }
            AppEvent::OfficesFetched(Err(e)) => {
                warn!("loading offices failed: {e}");
                self.offices.clear();
                self.facets = Facets::default();
                self.load_state = LoadState::Failed;
                self.viewport.handle(ViewportEvent::LoadFailed);
                self.notices.push(Notice::DataUnavailable);
                Vec::new()
            }
            AppEvent::RetryLoad => {
                if self.load_state == LoadState::Loading {
                    return Vec::new();
                }
                self.load_state = LoadState::Loading;
                vec![Command::FetchOffices]
            }
            AppEvent::FilterChanged(filter) => {
                if filter != self.filter {
                    self.filter = filter;
                    let filtered = self.filter.apply(&self.offices);
                    self.viewport.handle(ViewportEvent::FilterChanged(filtered));
                }
                Vec::new()
            }
            AppEvent::OfficeClicked(id) => {
                self.viewport.handle(ViewportEvent::Select(id));
                Vec::new()
            }
            AppEvent::NearMeRequested => {
                self.pending_lookup = true;
                vec![Command::LocateDevice]
            }
            AppEvent::AddressSearchRequested(query) => {
                let query = query.trim().to_string();
                if query.is_empty() {
                    return Vec::new();
                }
                self.pending_lookup = true;
                vec![Command::Geocode(query)]
            }
            AppEvent::DeviceLocated(result) => {
                self.pending_lookup = false;
                match result {
                    Ok(location) if location.is_valid() => {
                        self.viewport.handle(ViewportEvent::UserLocated(location));
                    }
                    Ok(location) => {
                        warn!("device reported invalid location {location}");
                        self.notices
                            .push(Notice::LocationUnavailable("position unavailable".to_string()));
                    }
                    Err(e) => {
                        warn!("{e}");
                        self.notices.push(Notice::LocationUnavailable(reason(e)));
                    }
                }
                Vec::new()
            }
            AppEvent::AddressResolved { query, result } => {
                self.pending_lookup = false;
                match result {
                    Ok(Some(location)) => {
                        self.viewport.handle(ViewportEvent::UserLocated(location));
                    }
                    Ok(None) => {
                        info!("no match for address {query:?}");
                        self.notices.push(Notice::AddressNotFound(query));
                    }
                    Err(e) => {
                        warn!("{e}");
                        self.notices.push(Notice::LookupFailed(reason(e)));
                    }
                }
                Vec::new()
            }
            AppEvent::BackToOverview => {
                self.viewport.handle(ViewportEvent::BackToOverview);
                Vec::new()
            }
            AppEvent::CameraSettled(camera) => {
                self.viewport.handle(ViewportEvent::CameraSettled(camera));
                Vec::new()
            }
        }
    }

    fn startup_commands(&mut self) -> Vec<Command> {
        match self.startup.take() {
            Some(StartupTrigger::NearMe) => self.handle(AppEvent::NearMeRequested),
            Some(StartupTrigger::Address(address)) => {
                self.handle(AppEvent::AddressSearchRequested(address))
            }
            None => Vec::new(),
        }
    }
}

fn reason(error: LocatorError) -> String {
    match error {
        LocatorError::Geocode(reason) | LocatorError::Geolocation(reason) => reason,
        other => other.to_string(),
    }
}
