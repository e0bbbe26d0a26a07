use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::filter::{FilterSpec, select, select_all_localities};
use super::model::{Dataset, JoinedRecord};

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

/// Meters in the locality, before any row filter.
pub fn meter_count(dataset: &Dataset, locality: &str) -> usize {
    dataset.meters.in_locality(locality).count()
}

/// Sum of the amounts present.
pub fn total_amount(rows: &[JoinedRecord]) -> f64 {
    rows.iter().filter_map(|r| r.amount).sum()
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// Granularity of the time series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TimeBucket {
    /// One point per distinct timestamp.
    #[default]
    Exact,
    Day,
    Month,
}

impl TimeBucket {
    pub const ALL: [TimeBucket; 3] = [TimeBucket::Exact, TimeBucket::Day, TimeBucket::Month];

    pub fn label(self) -> &'static str {
        match self {
            TimeBucket::Exact => "Timestamp",
            TimeBucket::Day => "Day",
            TimeBucket::Month => "Month",
        }
    }

    fn bucket(self, at: NaiveDateTime) -> NaiveDateTime {
        let midnight = |d: NaiveDate| d.and_time(chrono::NaiveTime::MIN);
        match self {
            TimeBucket::Exact => at,
            TimeBucket::Day => midnight(at.date()),
            TimeBucket::Month => midnight(at.date().with_day(1).unwrap_or(at.date())),
        }
    }
}

/// Amounts summed per bucket, in ascending time order. Rows without a
/// date or an amount do not contribute.
pub fn time_series(rows: &[JoinedRecord], bucket: TimeBucket) -> Vec<(NaiveDateTime, f64)> {
    let mut sums: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    for row in rows {
        if let (Some(date), Some(amount)) = (row.date, row.amount) {
            *sums.entry(bucket.bucket(date)).or_default() += amount;
        }
    }
    sums.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    /// Inclusive lower edge.
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Equal-width histogram of the amounts present. The last bin includes its
/// upper edge. Constant data collapses to a single bin.
pub fn histogram(rows: &[JoinedRecord], bins: usize) -> Vec<HistogramBin> {
    let amounts: Vec<f64> = rows.iter().filter_map(|r| r.amount).collect();
    if amounts.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = amounts.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = amounts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let range = max - min;
    if range.abs() < f64::EPSILON {
        return vec![HistogramBin {
            start: min - 0.5,
            end: max + 0.5,
            count: amounts.len(),
        }];
    }

    let width = range / bins as f64;
    let mut counts = vec![0usize; bins];
    for a in &amounts {
        let idx = (((a - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + i as f64 * width,
            end: min + (i + 1) as f64 * width,
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LocalityTotal {
    pub locality: String,
    pub total: f64,
}

/// Recharge totals per locality over every meter, with the row predicates of
/// `spec` applied but not its locality. Highest total first, ties by name.
pub fn ranking(dataset: &Dataset, spec: &FilterSpec) -> Vec<LocalityTotal> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for row in select_all_localities(dataset, spec) {
        *totals.entry(row.locality).or_default() += row.amount.unwrap_or(0.0);
    }

    let mut ranked: Vec<LocalityTotal> = totals
        .into_iter()
        .map(|(locality, total)| LocalityTotal { locality, total })
        .collect();
    ranked.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.locality.cmp(&b.locality))
    });
    ranked
}

// ---------------------------------------------------------------------------
// Summary – everything one filter change recomputes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub rows: Vec<JoinedRecord>,
    pub meter_count: usize,
    pub total_amount: f64,
    /// `None` when the journal has no date column.
    pub time_series: Option<Vec<(NaiveDateTime, f64)>>,
    pub histogram: Vec<HistogramBin>,
    pub ranking: Vec<LocalityTotal>,
}

impl Summary {
    pub fn compute(dataset: &Dataset, spec: &FilterSpec, bucket: TimeBucket, bins: usize) -> Self {
        let rows = select(dataset, spec);
        let time_series = dataset
            .recharges
            .has_dates
            .then(|| time_series(&rows, bucket));
        Self {
            meter_count: meter_count(dataset, &spec.locality),
            total_amount: total_amount(&rows),
            histogram: histogram(&rows, bins),
            ranking: ranking(dataset, spec),
            time_series,
            rows,
        }
    }
}
