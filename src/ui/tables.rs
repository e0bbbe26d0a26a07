use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::LocalityTotal;
use crate::data::export::{self, DATE_FORMAT};
use crate::data::model::JoinedRecord;
use crate::ui::format_amount;

const ROW_HEIGHT: f32 = 18.0;

/// Filtered joined rows, same columns as the CSV export.
pub fn detail_table(ui: &mut Ui, rows: &[JoinedRecord], with_dates: bool) {
    let headers = export::columns(with_dates);

    let mut table = TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(400.0);
    for _ in headers {
        table = table.column(Column::auto().at_least(90.0));
    }

    table
        .header(20.0, |mut header| {
            for name in headers {
                header.col(|ui| {
                    ui.strong(*name);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                let r = &rows[row.index()];
                row.col(|ui| {
                    ui.label(r.locality.as_str());
                });
                row.col(|ui| {
                    ui.label(r.meter_serial.as_str());
                });
                row.col(|ui| {
                    ui.label(r.amount.map(|a| a.to_string()).unwrap_or_default());
                });
                if with_dates {
                    row.col(|ui| {
                        ui.label(
                            r.date
                                .map(|d| d.format(DATE_FORMAT).to_string())
                                .unwrap_or_default(),
                        );
                    });
                }
            });
        });
}

/// Locality totals, best first.
pub fn ranking_table(ui: &mut Ui, ranking: &[LocalityTotal], currency: &str) {
    TableBuilder::new(ui)
        .striped(true)
        .max_scroll_height(400.0)
        .column(Column::exact(40.0))
        .column(Column::auto().at_least(160.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("#");
            });
            header.col(|ui| {
                ui.strong("Locality");
            });
            header.col(|ui| {
                ui.strong(format!("Total ({currency})"));
            });
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, ranking.len(), |mut row| {
                let i = row.index();
                let t = &ranking[i];
                row.col(|ui| {
                    ui.label((i + 1).to_string());
                });
                row.col(|ui| {
                    ui.label(t.locality.as_str());
                });
                row.col(|ui| {
                    ui.label(format_amount(t.total));
                });
            });
        });
}
