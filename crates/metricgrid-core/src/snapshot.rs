//! Immutable result of parsing one scrape payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sample::{MetricMetadata, Sample};

/// Parsed scrape payload. Created once per successful scrape and read-only
/// afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    samples: Vec<Sample>,
    metadata: BTreeMap<String, MetricMetadata>,
    #[serde(skip)]
    raw_payload: String,
    retrieved_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        samples: Vec<Sample>,
        metadata: BTreeMap<String, MetricMetadata>,
        raw_payload: String,
        retrieved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            samples,
            metadata,
            raw_payload,
            retrieved_at,
        }
    }

    /// Samples in payload order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Metadata keyed by metric name.
    pub fn metadata(&self) -> &BTreeMap<String, MetricMetadata> {
        &self.metadata
    }

    /// Metadata for a single metric name, if the payload declared any.
    pub fn metadata_for(&self, name: &str) -> Option<&MetricMetadata> {
        self.metadata.get(name)
    }

    pub fn raw_payload(&self) -> &str {
        &self.raw_payload
    }

    pub fn retrieved_at(&self) -> DateTime<Utc> {
        self.retrieved_at
    }
}
