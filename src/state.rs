use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::NaiveDate;

use crate::config::Settings;
use crate::data::aggregate::{Summary, TimeBucket};
use crate::data::cache::DatasetCache;
use crate::data::export;
use crate::data::filter::FilterSpec;
use crate::data::loader::load_dataset;
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Widget state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Details,
    Ranking,
}

/// Side-panel selections, as edited by the widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    pub locality: String,
    pub serial_search: String,
    pub amount_enabled: bool,
    pub amount_range: (f64, f64),
    /// `None` when the journal has no dated recharge.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub export_enabled: bool,
    pub bucket: TimeBucket,
}

impl Controls {
    fn initial(dataset: &Dataset) -> Self {
        Self {
            locality: dataset.meters.localities().into_iter().next().unwrap_or_default(),
            serial_search: String::new(),
            amount_enabled: true,
            amount_range: dataset.recharges.amount_bounds().unwrap_or((0.0, 0.0)),
            date_range: dataset.recharges.date_bounds(),
            export_enabled: true,
            bucket: TimeBucket::default(),
        }
    }

    /// The pipeline's view of the current selections.
    pub fn filter_spec(&self) -> FilterSpec {
        let search = self.serial_search.trim();
        FilterSpec {
            serial_substring: (!search.is_empty()).then(|| search.to_string()),
            amount_range: self.amount_enabled.then_some(self.amount_range),
            date_range: self.date_range,
            ..FilterSpec::for_locality(self.locality.as_str())
        }
    }

    /// Amount filter on with its minimum above its maximum.
    pub fn amount_inverted(&self) -> bool {
        self.amount_enabled && self.amount_range.0 > self.amount_range.1
    }

    pub fn dates_inverted(&self) -> bool {
        self.date_range.is_some_and(|(from, to)| from > to)
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,
    cache: DatasetCache,

    /// Current snapshot of the sources.
    pub dataset: Arc<Dataset>,
    pub localities: Vec<String>,
    pub amount_bounds: Option<(f64, f64)>,
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,

    pub controls: Controls,
    pub tab: Tab,

    /// Result of the last recompute and the inputs it was computed from.
    pub summary: Summary,
    computed_for: Option<(FilterSpec, TimeBucket)>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Load the sources for the first time. Any failure here is fatal for
    /// the whole program.
    pub fn open(settings: Settings, now: Instant) -> Result<Self> {
        settings.sources.check_exists()?;

        let mut cache = DatasetCache::new(settings.cache_ttl);
        let dataset = cache.get_or_load(now, || {
            load_dataset(&settings.sources, &settings.read_options)
        })?;

        let controls = Controls::initial(&dataset);
        let mut state = Self {
            localities: dataset.meters.localities(),
            amount_bounds: dataset.recharges.amount_bounds(),
            date_bounds: dataset.recharges.date_bounds(),
            settings,
            cache,
            dataset,
            controls,
            tab: Tab::Overview,
            summary: Summary::default(),
            computed_for: None,
            status_message: None,
        };
        state.recompute();
        Ok(state)
    }

    /// Re-read the sources if the cached snapshot has expired. A failed
    /// reload keeps the current data and reports the error.
    pub fn refresh(&mut self, now: Instant) {
        let settings = &self.settings;
        match self
            .cache
            .get_or_load(now, || load_dataset(&settings.sources, &settings.read_options))
        {
            Ok(dataset) => {
                if !Arc::ptr_eq(&dataset, &self.dataset) {
                    self.set_dataset(dataset);
                    self.status_message = None;
                }
            }
            Err(e) => {
                log::error!("Failed to reload sources: {e:#}");
                self.status_message = Some(format!("Reload failed, showing previous data: {e:#}"));
            }
        }
    }

    /// Drop the cached snapshot and read the sources again.
    pub fn reload(&mut self, now: Instant) {
        self.cache.invalidate();
        self.refresh(now);
    }

    /// Swap in a new snapshot, keeping selections that still make sense.
    fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.localities = dataset.meters.localities();
        if !self.localities.contains(&self.controls.locality) {
            self.controls.locality = self.localities.first().cloned().unwrap_or_default();
        }

        let amount_bounds = dataset.recharges.amount_bounds();
        if amount_bounds != self.amount_bounds {
            self.controls.amount_range = amount_bounds.unwrap_or((0.0, 0.0));
            self.amount_bounds = amount_bounds;
        }

        let date_bounds = dataset.recharges.date_bounds();
        if date_bounds != self.date_bounds {
            self.controls.date_range = date_bounds;
            self.date_bounds = date_bounds;
        }

        log::info!("Dataset refreshed: {} meters", dataset.meters.len());
        self.dataset = dataset;
        self.computed_for = None;
        self.recompute();
    }

    /// Recompute rows and aggregates if the selections changed since the
    /// last call.
    pub fn recompute(&mut self) {
        let key = (self.controls.filter_spec(), self.controls.bucket);
        if self.computed_for.as_ref() == Some(&key) {
            return;
        }
        self.summary = Summary::compute(
            &self.dataset,
            &key.0,
            key.1,
            self.settings.histogram_bins,
        );
        log::debug!(
            "Recomputed {} rows for '{}' (total {})",
            self.summary.rows.len(),
            key.0.locality,
            self.summary.total_amount
        );
        self.computed_for = Some(key);
    }

    /// Whether the map view can be shown at all.
    pub fn map_available(&self) -> bool {
        self.settings.capabilities.map
    }

    pub fn export_to(&mut self, path: &Path) {
        let with_dates = self.dataset.recharges.has_dates;
        match export::save_csv(path, &self.summary.rows, with_dates) {
            Ok(()) => {
                self.status_message = Some(format!("Exported {} rows", self.summary.rows.len()));
            }
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status_message = Some(format!("Export failed: {e:#}"));
            }
        }
    }
}
