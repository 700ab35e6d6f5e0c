//! Numeric interpretation of snapshots and history.
//!
//! Sample values stay raw text until they reach this module. Only finite
//! values take part in instant sums.

use std::collections::BTreeMap;

use metricgrid_core::{Labels, Snapshot};
use metricgrid_history::HistoryPoint;

use crate::definitions::MetricDefinition;
use crate::views::ChartPoint;

/// Parse a raw sample value, rejecting unparseable and non-finite tokens.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Sum of matching sample values per definition key.
///
/// A definition with no matching finite sample is absent from the result.
pub fn instant_values(snapshot: &Snapshot, definitions: &[MetricDefinition]) -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();
    for definition in definitions {
        let mut sum = 0.0;
        let mut found = false;
        for sample in snapshot.samples() {
            if !definition.matches(&sample.name) {
                continue;
            }
            if let Some(value) = parse_finite(&sample.value) {
                sum += value;
                found = true;
            }
        }
        if found {
            values.insert(definition.key.clone(), sum);
        }
    }
    values
}

/// Add `values` into `target`, summing keys present in both.
pub fn accumulate(target: &mut BTreeMap<String, f64>, values: BTreeMap<String, f64>) {
    for (key, value) in values {
        *target.entry(key).or_insert(0.0) += value;
    }
}

/// Per-second rate between adjacent points that both carry `key`.
///
/// Pairs with a decreasing value (counter reset) or non-positive elapsed
/// time produce no point.
pub fn rate_series(history: &[HistoryPoint], key: &str) -> Vec<ChartPoint> {
    history
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            let delta = curr.value(key)? - prev.value(key)?;
            if delta < 0.0 {
                return None;
            }
            let elapsed = (curr.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
            if elapsed <= 0.0 {
                return None;
            }
            Some(ChartPoint {
                timestamp: curr.timestamp,
                value: delta / elapsed,
            })
        })
        .collect()
}

/// Every point that carries `key`, verbatim.
pub fn gauge_series(history: &[HistoryPoint], key: &str) -> Vec<ChartPoint> {
    history
        .iter()
        .filter_map(|point| {
            Some(ChartPoint {
                timestamp: point.timestamp,
                value: point.value(key)?,
            })
        })
        .collect()
}

/// `"1.50 bytes"`, or `"1.50"` without a unit.
pub fn format_value(value: f64, unit: Option<&str>) -> String {
    match unit.map(str::trim).filter(|u| !u.is_empty()) {
        Some(unit) => format!("{value:.2} {unit}"),
        None => format!("{value:.2}"),
    }
}

/// Display unit of a rate: `"<unit>/s"`, or `"per sec"` without a unit.
pub fn rate_unit(unit: Option<&str>) -> String {
    match unit.map(str::trim).filter(|u| !u.is_empty()) {
        Some(unit) => format!("{unit}/s"),
        None => "per sec".to_string(),
    }
}

/// Chart identifier for a definition key within a history scope.
pub fn chart_id(scope: &str, key: &str) -> String {
    format!("{}-{}", sanitize(scope), sanitize(key))
}

/// Lowercase alphanumerics; everything else becomes `-`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                '-'
            }
        })
        .collect()
}

/// `none`, or `k="v"` pairs joined by `, ` in insertion order.
pub fn format_labels(labels: &Labels) -> String {
    if labels.is_empty() {
        return "none".to_string();
    }
    labels
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
