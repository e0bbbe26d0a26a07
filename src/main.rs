mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::RechargeBoardApp;
use clap::Parser;
use config::{Capabilities, Cli, Settings};
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let cli = Cli::parse();
    let capabilities = Capabilities::detect();
    if !capabilities.map {
        log::warn!("Built without the `map` feature: meter map disabled");
    }

    let app = match Settings::from_cli(cli, capabilities) {
        Ok(settings) => {
            log::info!(
                "Sources: inventory {}, recharges {}",
                settings.sources.inventory.display(),
                settings.sources.recharges.display()
            );
            RechargeBoardApp::start(settings)
        }
        Err(e) => {
            log::error!("Invalid configuration: {e:#}");
            RechargeBoardApp::Fatal(format!("{e:#}"))
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Recharge Board – Recharges by Locality",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
