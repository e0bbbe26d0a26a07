use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// Serial normalization
// ---------------------------------------------------------------------------

/// Canonical form of a meter serial: every whitespace character removed.
///
/// Both the inventory and the recharge journal go through this function, so
/// the join key compares equal on both sides.
pub fn normalize_serial(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One meter of the inventory, in long form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterRecord {
    pub locality: String,
    pub meter_serial: String,
}

/// The unpivoted inventory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterTable {
    pub records: Vec<MeterRecord>,
}

impl MeterTable {
    pub fn new(records: Vec<MeterRecord>) -> Self {
        Self { records }
    }

    /// Sorted, de-duplicated locality names.
    pub fn localities(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|m| m.locality.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Meters of one locality, in inventory order.
    pub fn in_locality<'a>(&'a self, locality: &'a str) -> impl Iterator<Item = &'a MeterRecord> {
        self.records.iter().filter(move |m| m.locality == locality)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

// ---------------------------------------------------------------------------
// Recharge journal
// ---------------------------------------------------------------------------

/// A single top-up transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RechargeRecord {
    pub meter_serial: String,
    pub amount: f64,
    pub date: Option<NaiveDateTime>,
}

/// The cleaned recharge journal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RechargeTable {
    pub records: Vec<RechargeRecord>,
    /// Whether the source file had a date column at all.
    pub has_dates: bool,
}

impl RechargeTable {
    pub fn new(records: Vec<RechargeRecord>, has_dates: bool) -> Self {
        Self { records, has_dates }
    }

    /// Smallest and largest amount, `None` when the journal is empty.
    pub fn amount_bounds(&self) -> Option<(f64, f64)> {
        self.records.iter().map(|r| r.amount).fold(None, |acc, a| match acc {
            None => Some((a, a)),
            Some((lo, hi)) => Some((lo.min(a), hi.max(a))),
        })
    }

    /// First and last calendar day over the non-null dates.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut days = self.records.iter().filter_map(|r| r.date).map(|d| d.date());
        let first = days.next()?;
        Some(days.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Recharges grouped by serial, each group in journal order.
    pub fn by_serial(&self) -> HashMap<&str, Vec<&RechargeRecord>> {
        let mut index: HashMap<&str, Vec<&RechargeRecord>> = HashMap::new();
        for r in &self.records {
            index.entry(r.meter_serial.as_str()).or_default().push(r);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

// ---------------------------------------------------------------------------
// Meter positions (optional)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Meter serial → position.
pub type PositionTable = HashMap<String, GeoPoint>;

// ---------------------------------------------------------------------------
// Joined rows
// ---------------------------------------------------------------------------

/// One row of the meter ⟕ recharge left join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub locality: String,
    pub meter_serial: String,
    pub amount: Option<f64>,
    pub date: Option<NaiveDateTime>,
}

// ---------------------------------------------------------------------------
// Dataset – everything loaded from the source files
// ---------------------------------------------------------------------------

/// Immutable snapshot of the three sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub meters: MeterTable,
    pub recharges: RechargeTable,
    pub positions: Option<PositionTable>,
    /// Why a locations file was given but could not be used.
    pub positions_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn normalized_serial_has_no_whitespace() {
        for raw in ["  0142 5567 ", "\t01-42\u{a0}99\n", "ABC", "   "] {
            let s = normalize_serial(raw);
            assert!(!s.chars().any(char::is_whitespace), "{raw:?} -> {s:?}");
            assert_eq!(s, raw.trim().split_whitespace().collect::<String>());
        }
    }

    #[test]
    fn localities_are_sorted_and_unique() {
        let table = MeterTable::new(vec![
            MeterRecord { locality: "Yaoundé".into(), meter_serial: "1".into() },
            MeterRecord { locality: "Bafia".into(), meter_serial: "2".into() },
            MeterRecord { locality: "Yaoundé".into(), meter_serial: "3".into() },
        ]);
        assert_eq!(table.localities(), vec!["Bafia", "Yaoundé"]);
        assert_eq!(table.in_locality("Yaoundé").count(), 2);
    }

    #[test]
    fn bounds_skip_missing_dates() {
        let table = RechargeTable::new(
            vec![
                RechargeRecord { meter_serial: "A".into(), amount: 500.0, date: Some(at(2024, 3, 2)) },
                RechargeRecord { meter_serial: "A".into(), amount: 1500.5, date: None },
                RechargeRecord { meter_serial: "B".into(), amount: 20.0, date: Some(at(2024, 1, 15)) },
            ],
            true,
        );
        assert_eq!(table.amount_bounds(), Some((20.0, 1500.5)));
        assert_eq!(
            table.date_bounds(),
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
            ))
        );
        assert_eq!(table.by_serial()["A"].len(), 2);
    }

    #[test]
    fn empty_journal_has_no_bounds() {
        let table = RechargeTable::default();
        assert_eq!(table.amount_bounds(), None);
        assert_eq!(table.date_bounds(), None);
    }
}
