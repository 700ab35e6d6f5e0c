//! Endpoint identities and per-endpoint scrape outcomes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// A metrics endpoint exposed by one instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRegistration {
    pub service_name: String,
    pub instance_name: String,
    pub endpoint_url: String,
}

impl EndpointRegistration {
    pub fn new(
        service_name: impl Into<String>,
        instance_name: impl Into<String>,
        endpoint_url: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            instance_name: instance_name.into(),
            endpoint_url: endpoint_url.into(),
        }
    }
}

/// Either a parsed snapshot or the reason the scrape failed.
#[derive(Debug, Clone)]
pub enum ScrapeOutcome {
    Success(Snapshot),
    Failure(String),
}

/// Result of scraping a single endpoint.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub registration: EndpointRegistration,
    pub outcome: ScrapeOutcome,
    /// Wall-clock time spent on the scrape, recorded for both outcomes.
    pub duration: Duration,
}

impl ScrapeReport {
    pub fn success(registration: EndpointRegistration, snapshot: Snapshot, duration: Duration) -> Self {
        Self {
            registration,
            outcome: ScrapeOutcome::Success(snapshot),
            duration,
        }
    }

    pub fn failure(
        registration: EndpointRegistration,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            registration,
            outcome: ScrapeOutcome::Failure(error.into()),
            duration,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.outcome {
            ScrapeOutcome::Success(snapshot) => Some(snapshot),
            ScrapeOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ScrapeOutcome::Success(_) => None,
            ScrapeOutcome::Failure(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScrapeOutcome::Success(_))
    }
}
