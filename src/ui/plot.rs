use chrono::{DateTime, NaiveDateTime};
use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Line, Plot, PlotPoints};

use crate::color::{BRAND_BLUE, TEAL, blues_gradient};
use crate::data::aggregate::{HistogramBin, LocalityTotal};

fn to_plot_x(at: &NaiveDateTime) -> f64 {
    at.and_utc().timestamp() as f64
}

fn format_plot_date(x: f64) -> String {
    DateTime::from_timestamp(x as i64, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// Recharge totals over time.
pub fn time_series_plot(ui: &mut Ui, series: &[(NaiveDateTime, f64)]) {
    if series.is_empty() {
        ui.label("No dated recharge in the selection.");
        return;
    }

    let points: PlotPoints = series
        .iter()
        .map(|(at, amount)| [to_plot_x(at), *amount])
        .collect();

    Plot::new("time_series")
        .height(140.0)
        .x_axis_formatter(|mark, _range| format_plot_date(mark.value))
        .label_formatter(|_name, point| format!("{}\n{:.0}", format_plot_date(point.x), point.y))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).color(BRAND_BLUE).width(1.5));
        });
}

/// Amount distribution.
pub fn histogram_plot(ui: &mut Ui, bins: &[HistogramBin], currency: &str) {
    if bins.is_empty() {
        ui.label("No amount in the selection.");
        return;
    }

    let bars: Vec<Bar> = bins
        .iter()
        .map(|b| {
            Bar::new(b.center(), b.count as f64)
                .width(b.width())
                .name(format!("{:.0} – {:.0}", b.start, b.end))
                .fill(TEAL)
        })
        .collect();

    Plot::new("amount_histogram")
        .height(220.0)
        .x_axis_label(format!("Amount ({currency})"))
        .y_axis_label("Count")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(TEAL));
        });
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Horizontal bars for the first `top` localities, best on top.
pub fn ranking_bar_chart(ui: &mut Ui, ranking: &[LocalityTotal], top: usize) {
    let shown = &ranking[..ranking.len().min(top)];
    if shown.is_empty() {
        ui.label("Nothing to rank.");
        return;
    }

    let colors = blues_gradient(shown.len());
    let n = shown.len();
    let bars: Vec<Bar> = shown
        .iter()
        .zip(colors)
        .enumerate()
        .map(|(i, (t, color))| {
            // First place gets the highest y so it is drawn at the top.
            Bar::new((n - 1 - i) as f64, t.total)
                .width(0.7)
                .name(&t.locality)
                .fill(color)
        })
        .collect();

    let names: Vec<String> = shown.iter().map(|t| t.locality.clone()).collect();
    Plot::new("ranking_bars")
        .height(320.0)
        .y_axis_formatter(move |mark, _range| {
            let v = mark.value;
            if v.fract().abs() > f64::EPSILON || v < 0.0 {
                return String::new();
            }
            let idx = v as usize;
            if idx >= n {
                return String::new();
            }
            names[n - 1 - idx].clone()
        })
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
        });
}
