use std::collections::HashSet;
use std::num::NonZeroUsize;

use eframe::egui;
use egui::{Color32, Style};
use log::{debug, warn};
use lru::LruCache;
use tokio::sync::mpsc;

use crate::config::{AppConfig, StartupTrigger};
use crate::error::{LocatorError, Result};
use crate::map::map::{Map, TileKey};
use crate::map::map_tile::MapTile;
use crate::maps_api::geocoder::{DeviceLocator, Geocoder};
use crate::maps_api::http_client;
use crate::maps_api::tile_retriever::TileRetriever;
use crate::offices::adapter::OfficeSource;
use crate::session::{AppEvent, Command, Notice, Session};
use crate::ui::office_list;
use crate::viewport::bounds::BoundsConfig;
use crate::viewport::controller::ViewState;

const MAP_ID: &str = "office_map";
const TILE_CACHE_SIZE: usize = 512;
/// Seconds a notice stays on screen.
const NOTICE_SECONDS: f64 = 6.0;

/// Remote collaborators, all sharing one HTTP client.
#[derive(Clone)]
pub struct Services {
    pub offices: OfficeSource,
    pub geocoder: Geocoder,
    pub locator: DeviceLocator,
    pub tiles: TileRetriever,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = http_client(&config.user_agent)?;
        Ok(Self {
            offices: OfficeSource::new(client.clone(), config.nocodb.clone()),
            geocoder: Geocoder::new(
                client.clone(),
                config.geocoder_url.clone(),
                config.geocoder_country.clone(),
            ),
            locator: DeviceLocator::new(client.clone(), config.geolocation_url.clone()),
            tiles: TileRetriever::new(client, config.tile_url.clone()),
        })
    }
}

pub struct MyApp {
    session: Session,
    services: Services,
    tile_cache: LruCache<TileKey, MapTile>,
    pending_tiles: HashSet<TileKey>,
    failed_tiles: HashSet<TileKey>,
    tile_receiver: mpsc::UnboundedReceiver<(TileKey, Result<MapTile>)>,
    tile_sender: mpsc::UnboundedSender<(TileKey, Result<MapTile>)>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
    runtime: tokio::runtime::Runtime,
    address_query: String,
    notices: Vec<(Notice, f64)>,
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // F11 toggles fullscreen
        if let Some(new_fullscreen) = ctx.input(|i| {
            i.key_pressed(egui::Key::F11)
                .then(|| !i.viewport().fullscreen.unwrap_or(false))
        }) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(new_fullscreen));
            ctx.send_viewport_cmd(egui::ViewportCommand::Decorations(!new_fullscreen));
        }

        while let Ok(event) = self.event_receiver.try_recv() {
            self.dispatch(ctx, event);
        }
        self.receive_tiles();

        let now = ctx.input(|i| i.time);
        self.notices
            .extend(self.session.take_notices().into_iter().map(|n| (n, now + NOTICE_SECONDS)));
        self.notices.retain(|(_, until)| *until > now);

        let mut events = Vec::new();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Constituency Offices");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Showing {} offices", self.session.filtered().len()));
                });
            });
        });

        if !self.notices.is_empty() {
            egui::TopBottomPanel::bottom("notices").show(ctx, |ui| {
                for (notice, _) in &self.notices {
                    ui.colored_label(Color32::from_rgb(200, 40, 40), notice.to_string());
                }
            });
        }

        egui::SidePanel::left("office_list")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                events.extend(office_list::show(ui, &self.session, &mut self.address_query));
            });

        let mut missing_tiles = Vec::new();
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let viewport = self.session.viewport();
                let output = Map::new(
                    MAP_ID,
                    &mut self.tile_cache,
                    &mut missing_tiles,
                    viewport.camera(),
                )
                .offices(self.session.filtered())
                .highlighted(viewport.highlighted())
                .popup(viewport.popup())
                .user_location(viewport.user_location())
                .back_button(viewport.state() == ViewState::Focused)
                .show(ui);

                if let Some(camera) = output.settled {
                    events.push(AppEvent::CameraSettled(camera));
                }
                if let Some(id) = output.clicked {
                    events.push(AppEvent::OfficeClicked(id));
                }
                if output.back {
                    events.push(AppEvent::BackToOverview);
                }
            });

        for event in events {
            self.dispatch(ctx, event);
        }
        self.request_tiles(ctx, missing_tiles);
    }
}

impl MyApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
        services: Services,
        startup: Option<StartupTrigger>,
    ) -> Self {
        cc.egui_ctx.set_style(Self::office_theme_style(&cc.egui_ctx));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .thread_name("office-map-io")
            .enable_all()
            .build()
            .expect("Unable to create runtime");
        let (tile_sender, tile_receiver) = mpsc::unbounded_channel();
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        let session = Session::new(BoundsConfig::default(), config.nearest_count, startup);
        let commands = session.start();

        let app = Self {
            session,
            services,
            tile_cache: LruCache::new(NonZeroUsize::new(TILE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)),
            pending_tiles: HashSet::new(),
            failed_tiles: HashSet::new(),
            tile_receiver,
            tile_sender,
            event_receiver,
            event_sender,
            runtime,
            address_query: String::new(),
            notices: Vec::new(),
        };
        for command in commands {
            app.execute(&cc.egui_ctx, command);
        }
        app
    }

    fn dispatch(&mut self, ctx: &egui::Context, event: AppEvent) {
        for command in self.session.handle(event) {
            self.execute(ctx, command);
        }
    }

    /// Runs a command on the runtime. Its result comes back as an [`AppEvent`].
    fn execute(&self, ctx: &egui::Context, command: Command) {
        debug!("executing {:?}", command);
        let sender = self.event_sender.clone();
        let requester = ctx.clone();
        let services = self.services.clone();

        self.runtime.spawn(async move {
            let event = match command {
                Command::FetchOffices => AppEvent::OfficesFetched(services.offices.fetch_offices().await),
                Command::LocateDevice => AppEvent::DeviceLocated(services.locator.locate().await),
                Command::Geocode(query) => {
                    let result = services.geocoder.lookup(&query).await;
                    AppEvent::AddressResolved { query, result }
                }
            };
            if sender.send(event).is_err() {
                warn!("app closed before a command finished");
            }
            requester.request_repaint();
        });
    }

    fn request_tiles(&mut self, ctx: &egui::Context, missing_tiles: Vec<TileKey>) {
        for key in missing_tiles {
            if self.pending_tiles.contains(&key)
                || self.failed_tiles.contains(&key)
                || self.tile_cache.contains(&key)
            {
                continue;
            }
            let sender = self.tile_sender.clone();
            let tile_retriever = self.services.tiles.clone();
            let requester = ctx.clone();
            let (z, x, y) = key;

            self.runtime.spawn(async move {
                let result = tile_retriever.fetch_tile(z, x, y).await;
                // Receiver only goes away on shutdown.
                let _ = sender.send((key, result));
                requester.request_repaint();
            });
            self.pending_tiles.insert(key);
        }
    }

    fn receive_tiles(&mut self) {
        while let Ok((key, result)) = self.tile_receiver.try_recv() {
            self.pending_tiles.remove(&key);
            match result {
                Ok(tile) => {
                    self.tile_cache.put(key, tile);
                }
                Err(e) => {
                    match &e {
                        LocatorError::Tile { .. } | LocatorError::Decode(_) => {
                            self.failed_tiles.insert(key);
                        }
                        _ => {}
                    }
                    warn!("Error fetching tile {:?}: {}", key, e);
                }
            }
        }
    }

    pub fn office_theme_style(ctx: &egui::Context) -> Style {
        use egui::{FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

        let mut style = (*ctx.style()).clone();

        style.text_styles = [
            (TextStyle::Heading, FontId::new(22.0, FontFamily::Proportional)),
            (TextStyle::Body, FontId::new(15.0, FontFamily::Proportional)),
            (TextStyle::Monospace, FontId::new(14.0, FontFamily::Monospace)),
            (TextStyle::Button, FontId::new(15.0, FontFamily::Proportional)),
            (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
        ]
        .into();

        let panel_bg = Color32::from_rgb(248, 249, 250);

        style.visuals = Visuals::light();
        style.visuals.panel_fill = panel_bg;
        style.visuals.window_fill = Color32::WHITE;
        style.visuals.window_rounding = Rounding::same(8.0);
        style.visuals.window_stroke = Stroke::new(1.0, Color32::from_gray(220));
        style.visuals.selection.bg_fill = Color32::from_rgb(227, 242, 253);
        style.visuals.selection.stroke = Stroke::new(1.0, Color32::from_rgb(21, 101, 192));
        style.visuals.hyperlink_color = Color32::from_rgb(0, 123, 255);

        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);

        style
    }
}
