use std::time::Instant;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::color::BRAND_BLUE;
use crate::data::aggregate::TimeBucket;
use crate::data::export;
use crate::state::{AppState, Tab};
use crate::ui::format_amount;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters & options");
    ui.separator();

    let localities = state.localities.clone();
    let amount_bounds = state.amount_bounds;
    let has_dates = state.dataset.recharges.has_dates;
    let controls = &mut state.controls;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Locality ----
            ui.strong("Locality");
            egui::ComboBox::from_id_salt("locality")
                .selected_text(&controls.locality)
                .width(ui.available_width())
                .show_ui(ui, |ui: &mut Ui| {
                    for loc in &localities {
                        ui.selectable_value(&mut controls.locality, loc.clone(), loc);
                    }
                });
            ui.add_space(6.0);

            // ---- Serial search ----
            ui.strong("Search a meter (serial)");
            ui.add(
                egui::TextEdit::singleline(&mut controls.serial_search)
                    .hint_text("part of a serial"),
            );
            ui.add_space(6.0);

            // ---- Amount range ----
            ui.checkbox(&mut controls.amount_enabled, RichText::new("Amount range").strong());
            match amount_bounds {
                Some((lo, hi)) => {
                    ui.add_enabled_ui(controls.amount_enabled, |ui: &mut Ui| {
                        let (min, max) = &mut controls.amount_range;
                        ui.add(egui::Slider::new(min, lo..=hi).text("min"));
                        ui.add(egui::Slider::new(max, lo..=hi).text("max"));
                    });
                    if controls.amount_inverted() {
                        ui.colored_label(Color32::YELLOW, "min is above max: nothing matches");
                    }
                }
                None => {
                    ui.label("No recharge amounts loaded.");
                }
            }
            ui.add_space(6.0);

            // ---- Date range ----
            if has_dates {
                ui.strong("Recharge period");
                match controls.date_range.as_mut() {
                    Some((from, to)) => {
                        ui.horizontal(|ui: &mut Ui| {
                            ui.label("from");
                            ui.add(DatePickerButton::new(from).id_salt("date_from"));
                        });
                        ui.horizontal(|ui: &mut Ui| {
                            ui.label("to");
                            ui.add(DatePickerButton::new(to).id_salt("date_to"));
                        });
                    }
                    None => {
                        ui.label("No valid recharge date.");
                    }
                }
                if controls.dates_inverted() {
                    ui.colored_label(Color32::YELLOW, "start is after end: nothing matches");
                }
                ui.add_space(6.0);

                ui.strong("Time series by");
                egui::ComboBox::from_id_salt("bucket")
                    .selected_text(controls.bucket.label())
                    .show_ui(ui, |ui: &mut Ui| {
                        for bucket in TimeBucket::ALL {
                            ui.selectable_value(&mut controls.bucket, bucket, bucket.label());
                        }
                    });
                ui.add_space(6.0);
            }

            ui.separator();
            ui.checkbox(&mut controls.export_enabled, "Allow CSV export");
        });

    // Recompute the selection after any widget change.
    state.recompute();
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the title and toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(
            RichText::new("Recharges by locality")
                .color(BRAND_BLUE)
                .strong(),
        );
    });

    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Reload sources").clicked() {
                state.reload(Instant::now());
                ui.close_menu();
            }
        });

        ui.separator();

        let ds = &state.dataset;
        ui.label(format!(
            "{} meters in {} localities, {} recharges",
            ds.meters.len(),
            state.localities.len(),
            ds.recharges.len()
        ));

        ui.separator();

        ui.selectable_value(&mut state.tab, Tab::Overview, "Overview");
        ui.selectable_value(&mut state.tab, Tab::Details, "Details");
        ui.selectable_value(&mut state.tab, Tab::Ranking, "Ranking");

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel – one view per tab
// ---------------------------------------------------------------------------

pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    match state.tab {
        Tab::Overview => overview(ui, state),
        Tab::Details => details(ui, state),
        Tab::Ranking => ranking(ui, state),
    }
}

fn overview(ui: &mut Ui, state: &AppState) {
    let summary = &state.summary;
    ui.columns(2, |cols| {
        kpi(&mut cols[0], "Meters shown", summary.meter_count.to_string());
        kpi(
            &mut cols[1],
            "Total recharges",
            format!("{} {}", format_amount(summary.total_amount), state.settings.currency),
        );
    });
    ui.separator();

    if let Some(series) = &summary.time_series {
        super::plot::time_series_plot(ui, series);
        ui.separator();
    }

    ui.strong("Amount distribution");
    super::plot::histogram_plot(ui, &summary.histogram, &state.settings.currency);
}

fn kpi(ui: &mut Ui, label: &str, value: String) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.label(label);
        ui.heading(RichText::new(value).strong());
    });
}

fn details(ui: &mut Ui, state: &mut AppState) {
    ui.heading(format!("Meters & recharges – {}", state.controls.locality));

    if state.controls.export_enabled && ui.button("Download (CSV)").clicked() {
        open_save_dialog(state);
    }

    let with_dates = state.dataset.recharges.has_dates;
    super::tables::detail_table(ui, &state.summary.rows, with_dates);

    ui.separator();
    if state.map_available() {
        map_section(ui, state);
    } else {
        ui.colored_label(Color32::YELLOW, "Map support not built in: the map is disabled.");
    }
}

#[cfg(feature = "map")]
fn map_section(ui: &mut Ui, state: &AppState) {
    let dataset = &state.dataset;
    match (&dataset.positions, &dataset.positions_error) {
        (Some(positions), _) => {
            ui.strong("Meter locations");
            super::map::meter_map(ui, &state.summary.rows, positions);
        }
        (None, Some(reason)) => {
            ui.colored_label(Color32::YELLOW, format!("Map unavailable: {reason}"));
        }
        (None, None) => {
            ui.label("No meter coordinates loaded (see --locations).");
        }
    }
}

#[cfg(not(feature = "map"))]
fn map_section(_ui: &mut Ui, _state: &AppState) {}

fn ranking(ui: &mut Ui, state: &AppState) {
    ui.heading("Locality ranking");
    super::tables::ranking_table(ui, &state.summary.ranking, &state.settings.currency);
    ui.separator();
    ui.strong("Top 10 localities by total amount");
    super::plot::ranking_bar_chart(ui, &state.summary.ranking, 10);
}

// ---------------------------------------------------------------------------
// Fatal screen
// ---------------------------------------------------------------------------

/// The only thing shown when the sources could not be loaded at startup.
pub fn fatal_panel(ui: &mut Ui, message: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.label(
            RichText::new(format!("Cannot start: {message}"))
                .color(Color32::RED)
                .heading(),
        );
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_save_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export recharges")
        .set_file_name(export::export_file_name(&state.controls.locality))
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export_to(&path);
    }
}
