use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

use super::loader::{RawTable, SourceRole};
use super::model::{
    GeoPoint, MeterRecord, MeterTable, PositionTable, RechargeRecord, RechargeTable,
    normalize_serial,
};

/// Headers accepted for the meter serial, in priority order.
pub const SERIAL_ALIASES: &[&str] = &["Recharge", "Meter SN", "MeterSerial", "Meter Serial", "Serial"];
pub const AMOUNT_ALIASES: &[&str] = &["Montant", "Amount"];
pub const DATE_ALIASES: &[&str] = &["Date"];
const LATITUDE_ALIASES: &[&str] = &["Latitude", "Lat"];
const LONGITUDE_ALIASES: &[&str] = &["Longitude", "Lon", "Lng"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Ways the raw tables can fail to reshape.
#[derive(Debug, Error, PartialEq)]
pub enum ReshapeError {
    #[error("{role} file has no '{column}' column")]
    MissingColumn { role: SourceRole, column: &'static str },

    /// `row` is the 1-based data row (header excluded).
    #[error("row {row}: amount '{value}' is not a number")]
    InvalidAmount { row: usize, value: String },
}

// ---------------------------------------------------------------------------
// Inventory: wide → long
// ---------------------------------------------------------------------------

/// Unpivot the inventory: each column is a locality, each non-empty cell a
/// meter serial. Output is column-major, like a `melt`.
pub fn melt_inventory(raw: &RawTable) -> MeterTable {
    let mut records = Vec::new();
    for (col, locality) in raw.columns.iter().enumerate() {
        for row in 0..raw.rows.len() {
            let Some(cell) = raw.cell(row, col) else {
                continue;
            };
            let meter_serial = normalize_serial(cell);
            if meter_serial.is_empty() {
                continue;
            }
            records.push(MeterRecord {
                locality: locality.clone(),
                meter_serial,
            });
        }
    }
    MeterTable::new(records)
}

// ---------------------------------------------------------------------------
// Recharge journal
// ---------------------------------------------------------------------------

/// Normalize a localized amount (`"1 500,50"`) and parse it. NaN and
/// infinities are rejected.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|a| a.is_finite())
}

/// Permissive date parsing; anything unrecognised is `None`.
/// Date-only values land on midnight.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Rename, drop incomplete rows, and parse amounts and dates.
///
/// An amount that does not parse fails the whole table; a date that does not
/// parse becomes `None` and the row stays.
pub fn clean_recharges(raw: &RawTable) -> Result<RechargeTable, ReshapeError> {
    let serial_idx = raw
        .find_column(SERIAL_ALIASES)
        .ok_or(ReshapeError::MissingColumn { role: SourceRole::Recharges, column: "Recharge" })?;
    let amount_idx = raw
        .find_column(AMOUNT_ALIASES)
        .ok_or(ReshapeError::MissingColumn { role: SourceRole::Recharges, column: "Montant" })?;
    let date_idx = raw.find_column(DATE_ALIASES);

    let mut records = Vec::with_capacity(raw.rows.len());
    let mut dropped = 0usize;
    let mut bad_dates = 0usize;

    for row in 0..raw.rows.len() {
        let (Some(serial), Some(amount)) = (raw.cell(row, serial_idx), raw.cell(row, amount_idx))
        else {
            dropped += 1;
            continue;
        };
        let meter_serial = normalize_serial(serial);
        if meter_serial.is_empty() {
            dropped += 1;
            continue;
        }

        let amount = parse_amount(amount).ok_or_else(|| ReshapeError::InvalidAmount {
            row: row + 1,
            value: amount.to_string(),
        })?;

        let date = date_idx.and_then(|i| raw.cell(row, i)).and_then(|cell| {
            let parsed = parse_date(cell);
            if parsed.is_none() {
                bad_dates += 1;
            }
            parsed
        });

        records.push(RechargeRecord {
            meter_serial,
            amount,
            date,
        });
    }

    if dropped > 0 {
        log::warn!("Dropped {dropped} recharge rows without serial or amount");
    }
    if bad_dates > 0 {
        log::debug!("{bad_dates} recharge dates could not be parsed and were left empty");
    }

    Ok(RechargeTable::new(records, date_idx.is_some()))
}

// ---------------------------------------------------------------------------
// Meter positions
// ---------------------------------------------------------------------------

/// Serial → coordinates. Rows with missing or unreadable coordinates are
/// skipped; a later row for the same serial wins.
pub fn positions(raw: &RawTable) -> Result<PositionTable, ReshapeError> {
    let missing = |column| ReshapeError::MissingColumn { role: SourceRole::Locations, column };
    let serial_idx = raw.find_column(SERIAL_ALIASES).ok_or_else(|| missing("Meter SN"))?;
    let lat_idx = raw.find_column(LATITUDE_ALIASES).ok_or_else(|| missing("Latitude"))?;
    let lon_idx = raw.find_column(LONGITUDE_ALIASES).ok_or_else(|| missing("Longitude"))?;

    let mut table = PositionTable::new();
    for row in 0..raw.rows.len() {
        let Some(serial) = raw.cell(row, serial_idx).map(normalize_serial) else {
            continue;
        };
        let latitude = raw.cell(row, lat_idx).and_then(parse_amount);
        let longitude = raw.cell(row, lon_idx).and_then(parse_amount);
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) if !serial.is_empty() => {
                table.insert(serial, GeoPoint { latitude, longitude });
            }
            _ => log::warn!("Skipping location row {} for meter '{serial}'", row + 1),
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(columns: &[&str], rows: &[&[Option<&str>]]) -> RawTable {
        RawTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[test]
    fn melt_is_column_major_and_drops_empty_cells() {
        let inventory = raw(
            &["Bafia", "Obala"],
            &[
                &[Some(" 0142 5567 "), Some("9001")],
                &[None, Some("  ")],
                &[Some("0142 9999"), None],
            ],
        );
        let meters = melt_inventory(&inventory);
        let pairs: Vec<_> = meters
            .records
            .iter()
            .map(|m| (m.locality.as_str(), m.meter_serial.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("Bafia", "01425567"), ("Bafia", "01429999"), ("Obala", "9001")]
        );
    }

    #[test]
    fn amounts_accept_localized_format() {
        assert_eq!(parse_amount("1 500,50"), Some(1500.5));
        assert_eq!(parse_amount(" 2000 "), Some(2000.0));
        assert_eq!(parse_amount("12.25"), Some(12.25));
        assert_eq!(parse_amount("1.500,50"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("   "), None);
    }

    #[test]
    fn dates_are_parsed_permissively() {
        let noon = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_date("2024-01-15 12:00:00"), Some(noon));
        assert_eq!(parse_date("2024-01-15T12:00:00"), Some(noon));
        assert_eq!(parse_date("2024-01-15T12:00:00+01:00"), Some(noon));
        assert_eq!(parse_date("15/01/2024 12:00"), Some(noon));
        assert_eq!(parse_date("2024-01-15"), Some(midnight));
        assert_eq!(parse_date("15/01/2024"), Some(midnight));
        assert_eq!(parse_date("15-01-2024"), Some(midnight));
        assert_eq!(parse_date("2024-13-45"), None);
        assert_eq!(parse_date("hier"), None);
    }

    #[test]
    fn recharges_are_renamed_and_cleaned() {
        let journal = raw(
            &["Recharge", "Montant", "Date"],
            &[
                &[Some(" 0142 5567"), Some("1 000,00"), Some("2024-01-15")],
                &[None, Some("300"), Some("2024-01-16")],
                &[Some("0142"), None, Some("2024-01-17")],
                &[Some("9001"), Some("250,5"), Some("pas une date")],
            ],
        );
        let table = clean_recharges(&journal).unwrap();

        assert!(table.has_dates);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].meter_serial, "01425567");
        assert_eq!(table.records[0].amount, 1000.0);
        assert!(table.records[0].date.is_some());
        assert_eq!(table.records[1].amount, 250.5);
        assert_eq!(table.records[1].date, None);
    }

    #[test]
    fn alternative_headers_are_recognised() {
        let journal = raw(&[" meter sn ", "AMOUNT"], &[&[Some("X"), Some("5")]]);
        let table = clean_recharges(&journal).unwrap();
        assert!(!table.has_dates);
        assert_eq!(table.records[0].meter_serial, "X");
    }

    #[test]
    fn missing_amount_column_is_reported() {
        let journal = raw(&["Recharge", "Total"], &[]);
        assert_eq!(
            clean_recharges(&journal).unwrap_err(),
            ReshapeError::MissingColumn { role: SourceRole::Recharges, column: "Montant" }
        );
    }

    #[test]
    fn unparseable_amount_fails_the_table() {
        let journal = raw(
            &["Recharge", "Montant"],
            &[&[Some("A"), Some("10")], &[Some("B"), Some("dix")]],
        );
        assert_eq!(
            clean_recharges(&journal).unwrap_err(),
            ReshapeError::InvalidAmount { row: 2, value: "dix".into() }
        );
    }

    #[test]
    fn non_finite_amounts_are_invalid() {
        for bad in ["NaN", "inf", "-infinity"] {
            assert_eq!(parse_amount(bad), None, "{bad}");
        }
        assert_eq!(parse_amount("1e3"), Some(1000.0));

        let journal = raw(
            &["Recharge", "Montant"],
            &[&[Some("1"), Some("10")], &[Some("2"), Some("NaN")]],
        );
        assert_eq!(
            clean_recharges(&journal).unwrap_err(),
            ReshapeError::InvalidAmount { row: 2, value: "NaN".into() }
        );
    }

    #[test]
    fn positions_skip_unreadable_rows() {
        let locations = raw(
            &["Meter SN", "Latitude", "Longitude"],
            &[
                &[Some("01 42"), Some("3,848"), Some("11.502")],
                &[Some("9001"), None, Some("11.0")],
                &[Some("7"), Some("north"), Some("11.0")],
            ],
        );
        let table = positions(&locations).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table["0142"], GeoPoint { latitude: 3.848, longitude: 11.502 });
    }
}
