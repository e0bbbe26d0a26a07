use chrono::NaiveDate;

use super::model::{Dataset, JoinedRecord, MeterRecord, RechargeTable};

// ---------------------------------------------------------------------------
// Filter specification
// ---------------------------------------------------------------------------

/// What the user selected in the side panel.
///
/// `locality` restricts the meters before the join; the other fields act on
/// joined rows. Inverted ranges match nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub locality: String,
    /// Case-sensitive substring of the meter serial. Empty means no filter.
    pub serial_substring: Option<String>,
    /// Inclusive. When set, rows without an amount are dropped.
    pub amount_range: Option<(f64, f64)>,
    /// Inclusive, by calendar day. Ignored when the journal has no date
    /// column; otherwise rows without a date are dropped.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl FilterSpec {
    pub fn for_locality(locality: impl Into<String>) -> Self {
        Self {
            locality: locality.into(),
            ..Default::default()
        }
    }

    /// Whether a joined row passes every non-locality predicate.
    pub fn matches(&self, row: &JoinedRecord, has_dates: bool) -> bool {
        if let Some(needle) = self.serial_substring.as_deref() {
            if !needle.is_empty() && !row.meter_serial.contains(needle) {
                return false;
            }
        }

        if let Some((min, max)) = self.amount_range {
            match row.amount {
                Some(a) if min <= a && a <= max => {}
                _ => return false,
            }
        }

        if let (Some((from, to)), true) = (self.date_range, has_dates) {
            match row.date.map(|d| d.date()) {
                Some(day) if from <= day && day <= to => {}
                _ => return false,
            }
        }

        true
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Left join of meters with recharges on the serial.
///
/// Rows follow meter order, then journal order within a meter. A meter with
/// no recharge yields one row with neither amount nor date.
pub fn left_join<'a>(
    meters: impl IntoIterator<Item = &'a MeterRecord>,
    recharges: &RechargeTable,
) -> Vec<JoinedRecord> {
    let index = recharges.by_serial();
    let mut rows = Vec::new();

    for meter in meters {
        match index.get(meter.meter_serial.as_str()) {
            Some(matches) => rows.extend(matches.iter().map(|r| JoinedRecord {
                locality: meter.locality.clone(),
                meter_serial: meter.meter_serial.clone(),
                amount: Some(r.amount),
                date: r.date,
            })),
            None => rows.push(JoinedRecord {
                locality: meter.locality.clone(),
                meter_serial: meter.meter_serial.clone(),
                amount: None,
                date: None,
            }),
        }
    }
    rows
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Restrict to the locality, join, then apply the row predicates.
pub fn select(dataset: &Dataset, spec: &FilterSpec) -> Vec<JoinedRecord> {
    let mut rows = left_join(dataset.meters.in_locality(&spec.locality), &dataset.recharges);
    rows.retain(|row| spec.matches(row, dataset.recharges.has_dates));
    rows
}

/// Join every meter regardless of locality, then apply the row predicates.
pub fn select_all_localities(dataset: &Dataset, spec: &FilterSpec) -> Vec<JoinedRecord> {
    let mut rows = left_join(&dataset.meters.records, &dataset.recharges);
    rows.retain(|row| spec.matches(row, dataset.recharges.has_dates));
    rows
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::data::model::{MeterTable, RechargeRecord};

    fn at(day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .and_then(|d| d.and_hms_opt(18, 45, 0))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn meter(locality: &str, serial: &str) -> MeterRecord {
        MeterRecord {
            locality: locality.into(),
            meter_serial: serial.into(),
        }
    }

    fn recharge(serial: &str, amount: f64, date: Option<NaiveDateTime>) -> RechargeRecord {
        RechargeRecord {
            meter_serial: serial.into(),
            amount,
            date,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            meters: MeterTable::new(vec![
                meter("Bafia", "1001"),
                meter("Bafia", "1002"),
                meter("Bafia", "2001"),
                meter("Obala", "3001"),
            ]),
            recharges: RechargeTable::new(
                vec![
                    recharge("1001", 100.0, at(1)),
                    recharge("1001", 250.0, at(2)),
                    recharge("1001", 400.0, None),
                    recharge("2001", 50.0, at(3)),
                    recharge("3001", 75.0, at(1)),
                    recharge("9999", 10.0, at(1)),
                ],
                true,
            ),
            ..Default::default()
        }
    }

    #[test]
    fn join_keeps_unmatched_meters_once() {
        let ds = dataset();
        let rows = select(&ds, &FilterSpec::for_locality("Bafia"));

        let of = |serial: &str| rows.iter().filter(|r| r.meter_serial == serial).collect::<Vec<_>>();
        assert_eq!(of("1001").len(), 3);
        let lonely = of("1002");
        assert_eq!(lonely.len(), 1);
        assert_eq!(lonely[0].amount, None);
        assert_eq!(lonely[0].date, None);
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.locality == "Bafia"));
    }

    #[test]
    fn join_preserves_meter_then_journal_order() {
        let ds = dataset();
        let rows = select(&ds, &FilterSpec::for_locality("Bafia"));
        let amounts: Vec<_> = rows.iter().map(|r| r.amount).collect();
        assert_eq!(
            amounts,
            vec![Some(100.0), Some(250.0), Some(400.0), None, Some(50.0)]
        );
    }

    #[test]
    fn unknown_locality_selects_nothing() {
        assert!(select(&dataset(), &FilterSpec::for_locality("Nowhere")).is_empty());
    }

    #[test]
    fn serial_substring_is_case_sensitive() {
        let ds = Dataset {
            meters: MeterTable::new(vec![meter("A", "abC1"), meter("A", "ABC2")]),
            ..Default::default()
        };
        let spec = FilterSpec {
            serial_substring: Some("bC".into()),
            ..FilterSpec::for_locality("A")
        };
        let rows = select(&ds, &spec);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].meter_serial, "abC1");

        let spec = FilterSpec {
            serial_substring: Some(String::new()),
            ..FilterSpec::for_locality("A")
        };
        assert_eq!(select(&ds, &spec).len(), 2);
    }

    #[test]
    fn amount_range_is_inclusive_and_drops_nulls() {
        let ds = dataset();
        let spec = FilterSpec {
            amount_range: Some((50.0, 250.0)),
            ..FilterSpec::for_locality("Bafia")
        };
        let amounts: Vec<_> = select(&ds, &spec).iter().filter_map(|r| r.amount).collect();
        assert_eq!(amounts, vec![100.0, 250.0, 50.0]);
    }

    #[test]
    fn full_amount_bounds_only_drop_null_rows() {
        let ds = dataset();
        let unfiltered = select(&ds, &FilterSpec::for_locality("Bafia"));
        let spec = FilterSpec {
            amount_range: ds.recharges.amount_bounds(),
            ..FilterSpec::for_locality("Bafia")
        };
        let bounded = select(&ds, &spec);

        let with_amount = unfiltered.iter().filter(|r| r.amount.is_some()).count();
        assert_eq!(bounded.len(), with_amount);
        assert_eq!(bounded.len(), unfiltered.len() - 1);
    }

    #[test]
    fn inverted_ranges_match_nothing() {
        let ds = dataset();
        let spec = FilterSpec {
            amount_range: Some((500.0, 10.0)),
            ..FilterSpec::for_locality("Bafia")
        };
        assert!(select(&ds, &spec).is_empty());

        let spec = FilterSpec {
            date_range: Some((day(9), day(1))),
            ..FilterSpec::for_locality("Bafia")
        };
        assert!(select(&ds, &spec).is_empty());
    }

    #[test]
    fn date_range_covers_whole_days() {
        let ds = dataset();
        let spec = FilterSpec {
            date_range: Some((day(2), day(3))),
            ..FilterSpec::for_locality("Bafia")
        };
        let amounts: Vec<_> = select(&ds, &spec).iter().filter_map(|r| r.amount).collect();
        assert_eq!(amounts, vec![250.0, 50.0]);
    }

    #[test]
    fn date_range_ignored_without_date_column() {
        let mut ds = dataset();
        ds.recharges.has_dates = false;
        let spec = FilterSpec {
            date_range: Some((day(2), day(2))),
            ..FilterSpec::for_locality("Bafia")
        };
        assert_eq!(select(&ds, &spec).len(), 5);
    }

    #[test]
    fn all_localities_ignores_locality() {
        let ds = dataset();
        let rows = select_all_localities(&ds, &FilterSpec::for_locality("Bafia"));
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().any(|r| r.locality == "Obala"));
    }
}
