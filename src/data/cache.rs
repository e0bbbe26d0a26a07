use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use super::model::Dataset;

/// Default freshness window for the loaded sources.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry {
    dataset: Arc<Dataset>,
    loaded_at: Instant,
}

/// Time-to-live snapshot of the loaded dataset.
///
/// Within `ttl` of the last successful load, reads hand back the same
/// `Arc`; after that the next read reloads. A failed reload keeps the
/// previous snapshot and serves it for another window before retrying.
pub struct DatasetCache {
    ttl: Duration,
    entry: Option<Entry>,
    invalidated: bool,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: None,
            invalidated: false,
        }
    }

    /// Whether a snapshot exists and is younger than the TTL at `now`.
    pub fn is_fresh(&self, now: Instant) -> bool {
        !self.invalidated
            && self
                .entry
                .as_ref()
                .is_some_and(|e| now.saturating_duration_since(e.loaded_at) < self.ttl)
    }

    /// Return the cached snapshot if fresh at `now`, otherwise run `load`
    /// and cache its result.
    pub fn get_or_load<F>(&mut self, now: Instant, load: F) -> Result<Arc<Dataset>>
    where
        F: FnOnce() -> Result<Dataset>,
    {
        if self.is_fresh(now) {
            if let Some(entry) = &self.entry {
                return Ok(Arc::clone(&entry.dataset));
            }
        }

        let dataset = match load() {
            Ok(dataset) => Arc::new(dataset),
            Err(e) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.loaded_at = now;
                    self.invalidated = false;
                }
                return Err(e);
            }
        };
        log::debug!("Dataset cache refreshed (ttl {:?})", self.ttl);
        self.entry = Some(Entry {
            dataset: Arc::clone(&dataset),
            loaded_at: now,
        });
        self.invalidated = false;
        Ok(dataset)
    }

    /// Force the next read to reload.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;

    use super::*;
    use crate::data::loader::{ReadOptions, Sources, load_dataset};
    use crate::data::model::{MeterRecord, MeterTable};

    fn snapshot(serial: &str) -> Dataset {
        Dataset {
            meters: MeterTable::new(vec![MeterRecord {
                locality: "Bafia".into(),
                meter_serial: serial.into(),
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn reads_within_ttl_share_the_snapshot() {
        let mut cache = DatasetCache::new(Duration::from_secs(300));
        let loads = Cell::new(0);
        let load = || -> Result<Dataset> {
            loads.set(loads.get() + 1);
            Ok(snapshot("1"))
        };
        let t0 = Instant::now();

        let first = cache.get_or_load(t0, load).unwrap();
        let second = cache
            .get_or_load(t0 + Duration::from_secs(299), load)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn cached_files_are_not_reread() {
        let dir = tempfile::tempdir().unwrap();
        let sources = Sources {
            inventory: dir.path().join("inv.csv"),
            recharges: dir.path().join("rech.csv"),
            locations: None,
        };
        std::fs::write(&sources.inventory, "Bafia\n0142 5567\n").unwrap();
        std::fs::write(&sources.recharges, "Recharge,Montant\n01425567,\"1 000\"\n").unwrap();
        let options = ReadOptions::default();
        let mut cache = DatasetCache::default();
        let t0 = Instant::now();

        let first = cache
            .get_or_load(t0, || load_dataset(&sources, &options))
            .unwrap();
        std::fs::remove_file(&sources.recharges).unwrap();
        let second = cache
            .get_or_load(t0 + Duration::from_secs(10), || load_dataset(&sources, &options))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.recharges.records[0].amount, 1000.0);
    }

    #[test]
    fn expired_snapshot_is_reloaded() {
        let mut cache = DatasetCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        let first = cache.get_or_load(t0, || Ok(snapshot("1"))).unwrap();
        assert!(!cache.is_fresh(t0 + Duration::from_secs(300)));

        let second = cache
            .get_or_load(t0 + Duration::from_secs(300), || Ok(snapshot("2")))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.meters.records[0].meter_serial, "2");
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let mut cache = DatasetCache::new(Duration::from_secs(1));
        let t0 = Instant::now();
        cache.get_or_load(t0, || Ok(snapshot("1"))).unwrap();

        let later = t0 + Duration::from_secs(5);
        assert!(cache.get_or_load(later, || Err(anyhow!("gone"))).is_err());

        // no retry until the window has passed again
        let kept = cache.get_or_load(later, || Ok(snapshot("2"))).unwrap();
        assert_eq!(kept.meters.records[0].meter_serial, "1");
    }

    #[test]
    fn invalidate_forces_reload() {
        let mut cache = DatasetCache::default();
        let t0 = Instant::now();
        cache.get_or_load(t0, || Ok(snapshot("1"))).unwrap();
        cache.invalidate();
        assert!(!cache.is_fresh(t0));

        let reloaded = cache.get_or_load(t0, || Ok(snapshot("2"))).unwrap();
        assert_eq!(reloaded.meters.records[0].meter_serial, "2");
        assert!(cache.is_fresh(t0));
    }
}
