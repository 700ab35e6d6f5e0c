//! metricgrid-core — shared data model for the metricgrid crates.
//!
//! Everything here is plain data: parsed samples and their metadata,
//! immutable scrape snapshots, endpoint identities, and the outcome of
//! scraping one endpoint. Numeric interpretation of sample values is
//! deliberately left to the consumer; a `Sample` keeps the value token
//! exactly as it appeared in the payload.

pub mod kind;
pub mod report;
pub mod sample;
pub mod snapshot;

pub use kind::MetricKind;
pub use report::{EndpointRegistration, ScrapeOutcome, ScrapeReport};
pub use sample::{Labels, MetricMetadata, Sample};
pub use snapshot::Snapshot;
