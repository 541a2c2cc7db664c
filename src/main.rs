//! Application entry point: doc-narrator.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults on first run, then saved).
//! 3. Create the [`tokio`] runtime used for the file dialog and extraction.
//! 4. Pick the speech engine factory for this build.
//! 5. Run [`eframe::run_native`]: blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use anyhow::anyhow;
use doc_narrator::{
    app::{DocNarratorApp, APP_TITLE},
    config::{AppConfig, AppPaths},
    narration::{platform_engine, EngineFactory},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let vp = egui::ViewportBuilder::default()
        .with_title(APP_TITLE)
        .with_inner_size(config.ui.window_size)
        .with_min_inner_size([480.0, 360.0])
        .with_drag_and_drop(true);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("doc-narrator starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if AppConfig::is_first_run() {
        match config.save() {
            Ok(()) => log::info!(
                "wrote default settings to {}",
                AppPaths::new().settings_file.display()
            ),
            Err(e) => log::warn!("could not write default settings: {e}"),
        }
    }

    // 3. Tokio runtime (dialog future + blocking extraction pool)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Speech engines are built per narration session
    if cfg!(feature = "speech") {
        log::info!("speech: platform text-to-speech enabled");
    } else {
        log::info!("speech: built without the `speech` feature; narration is silent");
    }
    let engines: EngineFactory = Arc::new(platform_engine);

    // 5. Build the egui app and run it (blocks until the window is closed)
    let app = DocNarratorApp::new(rt.handle().clone(), engines, config.clone());
    let options = native_options(&config);

    eframe::run_native(APP_TITLE, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow!("window error: {e}"))
}
