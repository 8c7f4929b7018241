#![warn(clippy::all, rust_2018_idioms)]

use std::sync::Arc;
use std::time::Duration;

use meme_studio::api::{HttpMemeApi, MemeApi};
use meme_studio::config::AppConfig;
use meme_studio::text::FontBook;
use meme_studio::MemeApp;

fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration, using defaults: {err}");
            AppConfig::default()
        }
    };
    let fonts = match FontBook::from_config(&config.fonts) {
        Ok(fonts) => Arc::new(fonts),
        Err(err) => return Err(eframe::Error::AppCreation(Box::new(err))),
    };
    let api: Arc<dyn MemeApi> =
        match HttpMemeApi::new(&config.api_base_url, Duration::from_secs(config.request_timeout_secs)) {
            Ok(api) => Arc::new(api),
            Err(err) => return Err(eframe::Error::AppCreation(Box::new(err))),
        };
    log::info!("Using meme backend at {}", config.api_base_url);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Meme Studio")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 520.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Meme Studio",
        native_options,
        Box::new(move |cc| {
            let app = MemeApp::new(cc, config, fonts, api)?;
            Ok(Box::new(app))
        }),
    )
}
