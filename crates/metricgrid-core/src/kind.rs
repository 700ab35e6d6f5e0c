//! Counter/gauge classification of a metric.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a metric's values are interpreted for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Cumulative; displayed as a per-second rate.
    Counter,
    /// Point-in-time; displayed as-is.
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}
