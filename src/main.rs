mod animation;
mod api;
mod app;
mod charts;
mod color;
mod config;
mod data;
mod refresh;
mod state;
mod ui;
mod worker;

use anyhow::Context;
use app::HealthAtlasApp;
use config::AppConfig;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    log::info!("Starting with {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Health Atlas – World Bank health indicators",
        options,
        Box::new(|cc| Ok(Box::new(HealthAtlasApp::new(cc, config)?))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
