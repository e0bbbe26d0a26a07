use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::model::JoinedRecord;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
struct ExportRow<'a> {
    locality: &'a str,
    meter_serial: &'a str,
    amount: Option<f64>,
}

#[derive(Serialize)]
struct DatedExportRow<'a> {
    locality: &'a str,
    meter_serial: &'a str,
    amount: Option<f64>,
    date: Option<String>,
}

/// Column headers of the detail table, and of the export.
pub fn columns(with_dates: bool) -> &'static [&'static str] {
    if with_dates {
        &["Locality", "MeterSerial", "Amount", "Date"]
    } else {
        &["Locality", "MeterSerial", "Amount"]
    }
}

/// Write the rows as UTF-8 CSV, header first. Missing values are empty
/// fields.
pub fn write_csv<W: Write>(writer: W, rows: &[JoinedRecord], with_dates: bool) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(columns(with_dates))
        .context("writing CSV header")?;

    for row in rows {
        let written = if with_dates {
            wtr.serialize(DatedExportRow {
                locality: &row.locality,
                meter_serial: &row.meter_serial,
                amount: row.amount,
                date: row.date.map(|d| d.format(DATE_FORMAT).to_string()),
            })
        } else {
            wtr.serialize(ExportRow {
                locality: &row.locality,
                meter_serial: &row.meter_serial,
                amount: row.amount,
            })
        };
        written.with_context(|| format!("writing row for meter {}", row.meter_serial))?;
    }

    wtr.flush().context("flushing CSV")?;
    Ok(())
}

/// Default file name for a locality export.
pub fn export_file_name(locality: &str) -> String {
    let safe: String = locality
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("recharges_{safe}.csv")
}

pub fn save_csv(path: &Path, rows: &[JoinedRecord], with_dates: bool) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(std::io::BufWriter::new(file), rows, with_dates)?;
    log::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}
