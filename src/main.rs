#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use officemap::config::{AppConfig, StartupTrigger};
use officemap::ui::my_app::{MyApp, Services};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    let args: Vec<String> = std::env::args().collect();
    let startup = StartupTrigger::from_args(&args);
    let services = Services::from_config(&config)?;
    log::info!("starting with {:?}", startup);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1280.0, 800.0))
            .with_min_inner_size(egui::vec2(400.0, 300.0))
            .with_title("Constituency Offices")
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "Constituency Offices",
        native_options,
        Box::new(move |cc| Ok(Box::new(MyApp::new(cc, &config, services, startup)))),
    )?;
    Ok(())
}
