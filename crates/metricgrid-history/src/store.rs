//! Bounded per-key history store.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Default number of points retained per key.
pub const DEFAULT_MAX_POINTS: usize = 120;

/// Values recorded for one key at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    /// Definition key → instant value.
    pub values: BTreeMap<String, f64>,
}

impl HistoryPoint {
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

type Series = Arc<Mutex<VecDeque<HistoryPoint>>>;

/// Thread-safe store of bounded point sequences keyed by string.
///
/// Appends are not reordered: callers are expected to feed increasing
/// timestamps per key.
pub struct HistoryStore {
    series: RwLock<HashMap<String, Series>>,
    max_points: usize,
}

impl HistoryStore {
    /// Create a store retaining at most `max_points` points per key.
    pub fn new(max_points: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            max_points,
        }
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Append a point for `key`, evicting the oldest points past capacity.
    pub fn add_snapshot(&self, key: &str, timestamp: DateTime<Utc>, values: BTreeMap<String, f64>) {
        let series = self.series_for(key);
        let mut points = series.lock().unwrap_or_else(PoisonError::into_inner);

        points.push_back(HistoryPoint { timestamp, values });
        let mut evicted = 0;
        while points.len() > self.max_points {
            points.pop_front();
            evicted += 1;
        }

        if evicted > 0 {
            debug!(key, evicted, retained = points.len(), "history capacity reached");
        }
    }

    /// Copy of the history for `key`, oldest first. Empty for unknown keys.
    pub fn history(&self, key: &str) -> Vec<HistoryPoint> {
        let series = {
            let map = self.series.read().unwrap_or_else(PoisonError::into_inner);
            match map.get(key) {
                Some(series) => series.clone(),
                None => return Vec::new(),
            }
        };

        let points = series.lock().unwrap_or_else(PoisonError::into_inner);
        points.iter().cloned().collect()
    }

    /// All keys that have received at least one append.
    pub fn keys(&self) -> Vec<String> {
        let map = self.series.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Find or create the series for `key`.
    fn series_for(&self, key: &str) -> Series {
        {
            let map = self.series.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(series) = map.get(key) {
                return series.clone();
            }
        }

        let mut map = self.series.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POINTS)
    }
}
