use std::collections::HashSet;

use eframe::egui::{Color32, Ui};
use egui_plot::{Plot, PlotPoints, Points};

use crate::data::model::{JoinedRecord, PositionTable};

/// Scatter of the selected meters that have coordinates.
pub fn meter_map(ui: &mut Ui, rows: &[JoinedRecord], positions: &PositionTable) {
    let mut seen = HashSet::new();
    let points: PlotPoints = rows
        .iter()
        .filter(|r| seen.insert(r.meter_serial.as_str()))
        .filter_map(|r| positions.get(&r.meter_serial))
        .map(|p| [p.longitude, p.latitude])
        .collect();

    if points.points().is_empty() {
        ui.label("None of the selected meters has coordinates.");
        return;
    }

    Plot::new("meter_map")
        .height(400.0)
        .data_aspect(1.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .show(ui, |plot_ui| {
            plot_ui.points(Points::new(points).radius(3.0).color(Color32::BLUE));
        });
}
