use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;

use gasview::app::GasviewApp;
use gasview::config::Settings;
use gasview::data::cache;
use gasview::state::AppState;

fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::parse();
    log::info!(
        "Dataset {} (engine: {})",
        settings.dataset.display(),
        settings.engine
    );
    let cache = cache::install_global(settings.dataset_source())?;
    let state = AppState::new(cache, settings.model.clone(), settings.neighbors);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gasview – Gasification Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(GasviewApp::new(state)))),
    )
    .map_err(|e| anyhow!("viewer exited with error: {e}"))
}
