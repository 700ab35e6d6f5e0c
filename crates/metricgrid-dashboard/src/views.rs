//! Display-ready aggregate types.
//!
//! These carry pre-formatted strings so a rendering layer can show them
//! without interpreting metric values itself. All of them serialize with
//! serde for JSON consumers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use metricgrid_core::EndpointRegistration;

// ── Cards and Charts ────────────────────────────────────────────

/// One headline value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardCard {
    pub title: String,
    /// Formatted value, e.g. `"12.50 requests/s"` or `"n/a"`.
    pub value: String,
    pub unit: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// A time series for one definition within one history scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardChart {
    pub id: String,
    pub title: String,
    pub unit: String,
    /// `true` when points are per-second rates derived from a counter.
    pub is_rate: bool,
    pub points: Vec<ChartPoint>,
}

// ── Tables ──────────────────────────────────────────────────────

/// Number of series sharing a metric name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    pub help: Option<String>,
    pub series_count: usize,
}

/// One row of a sample table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRow {
    pub name: String,
    /// Labels formatted as `k="v", ...` or `none`.
    pub labels: String,
    /// Raw value at instance level; formatted sum at service level.
    pub value: String,
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    pub help: Option<String>,
}

// ── Aggregates ──────────────────────────────────────────────────

/// Everything shown for one scraped endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceAggregate {
    pub registration: EndpointRegistration,
    pub retrieved_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub scrape_duration_ms: f64,
    pub cards: Vec<DashboardCard>,
    pub charts: Vec<DashboardChart>,
    pub pinned_cards: Vec<DashboardCard>,
    pub pinned_charts: Vec<DashboardChart>,
    pub series: Vec<SeriesSummary>,
    pub samples: Vec<SampleRow>,
    pub total_samples: usize,
}

impl InstanceAggregate {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Roll-up across all instances of a service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceAggregate {
    pub cards: Vec<DashboardCard>,
    pub charts: Vec<DashboardChart>,
    pub pinned_cards: Vec<DashboardCard>,
    pub pinned_charts: Vec<DashboardChart>,
    pub series: Vec<SeriesSummary>,
    pub samples: Vec<SampleRow>,
    pub total_samples: usize,
    pub instance_count: usize,
    pub successful_instances: usize,
    pub failed_instances: usize,
    pub average_scrape_duration_ms: f64,
    pub latest_scrape: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub service_name: String,
    pub aggregate: ServiceAggregate,
    pub instances: Vec<InstanceAggregate>,
}

/// Result of one dashboard refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub endpoint_count: usize,
    pub pinned_metrics: Vec<String>,
    pub services: Vec<ServiceView>,
}

impl DashboardView {
    pub fn has_endpoints(&self) -> bool {
        self.endpoint_count > 0
    }
}
