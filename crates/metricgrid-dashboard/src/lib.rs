//! metricgrid-dashboard — dashboard aggregation over scraped metrics.
//!
//! # Architecture
//!
//! ```text
//!   EndpointRegistration[]
//!          │
//!          ▼
//!   ┌──────────────┐   ScrapeReport[]   ┌──────────────┐
//!   │   Scraper    │ ─────────────────▶ │  Aggregator  │
//!   └──────────────┘                    └──────┬───────┘
//!                                              │ instant values
//!                     DefinitionRegistry ──────┤ (fixed + pinned)
//!                                              ▼
//!                                       ┌──────────────┐
//!                                       │ HistoryStore │
//!                                       └──────┬───────┘
//!                                              │ rate / gauge series
//!                                              ▼
//!                                   cards, charts, tables
//!                                   per instance and service
//! ```
//!
//! Sample values arrive as raw text; this crate is where they become
//! numbers. Counters are shown as per-second rates derived from consecutive
//! history points, gauges as recorded.

pub mod aggregator;
pub mod dashboard;
pub mod definitions;
pub mod pins;
pub mod series;
pub mod views;

pub use aggregator::{Aggregator, SAMPLE_LIMIT, instance_history_key, service_history_key};
pub use dashboard::Dashboard;
pub use definitions::{
    DefinitionRegistry, DefinitionTemplate, MetricDefinition, classify_kind, pinned_definitions,
    resolve_definition,
};
pub use pins::PinnedMetrics;
pub use views::{
    ChartPoint, DashboardCard, DashboardChart, DashboardView, InstanceAggregate, SampleRow,
    SeriesSummary, ServiceAggregate, ServiceView,
};
