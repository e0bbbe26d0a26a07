use std::time::Instant;

use eframe::egui;

use crate::config::Settings;
use crate::state::AppState;
use crate::ui::panels;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub enum RechargeBoardApp {
    Dashboard(Box<AppState>),
    /// Startup failed; only the message is rendered.
    Fatal(String),
}

impl RechargeBoardApp {
    /// Load the sources, or settle on the fatal screen.
    pub fn start(settings: Settings) -> Self {
        match AppState::open(settings, Instant::now()) {
            Ok(state) => Self::Dashboard(Box::new(state)),
            Err(e) => {
                log::error!("Startup failed: {e:#}");
                Self::Fatal(format!("{e:#}"))
            }
        }
    }
}

impl eframe::App for RechargeBoardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let state = match self {
            Self::Dashboard(state) => state,
            Self::Fatal(message) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    panels::fatal_panel(ui, message);
                });
                return;
            }
        };

        // Re-read the sources once the cached snapshot has expired.
        state.refresh(Instant::now());

        // ---- Top panel: title, menu and tabs ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, state);
            });

        // ---- Central panel: current tab ----
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                panels::central_panel(ui, state);
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Capabilities;
    use crate::data::loader::{ReadOptions, Sources};

    #[test]
    fn missing_sources_end_on_fatal_screen() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inv.csv"), "Bafia\n1\n").unwrap();
        let settings = Settings {
            sources: Sources {
                inventory: dir.path().join("inv.csv"),
                recharges: dir.path().join("recharge1.csv"),
                locations: None,
            },
            read_options: ReadOptions::default(),
            cache_ttl: Duration::from_secs(300),
            currency: "XAF".into(),
            histogram_bins: 30,
            capabilities: Capabilities { map: true },
        };

        match RechargeBoardApp::start(settings) {
            RechargeBoardApp::Fatal(message) => {
                assert!(message.contains("recharge1.csv"), "{message}");
            }
            RechargeBoardApp::Dashboard(_) => panic!("dashboard without sources"),
        }
    }
}
