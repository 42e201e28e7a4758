//! Vcomm - Virtual Null Modem
//!
//! Windowed front-end: creates and supervises a linked pseudo-terminal
//! pair through the core library.

use eframe::egui;
use vcomm_core::config::AppConfig;

mod gui;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Vcomm v{}", env!("CARGO_PKG_VERSION"));

    let window = AppConfig::load().map(|c| c.window).unwrap_or_default();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([window.width, window.height])
        .with_min_inner_size([560.0, 480.0])
        .with_title("Vcomm - Virtual Null Modem");

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Vcomm",
        native_options,
        Box::new(|cc| Ok(Box::new(gui::VcommApp::new(cc)))),
    )
}
