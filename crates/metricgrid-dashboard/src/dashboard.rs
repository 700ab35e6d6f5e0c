//! One refresh pass: scrape every endpoint, then aggregate.

use std::time::Instant;

use tokio::sync::watch;
use tracing::info;

use metricgrid_core::EndpointRegistration;
use metricgrid_scrape::{ScrapeError, Scraper};

use crate::aggregator::Aggregator;
use crate::views::DashboardView;

/// Couples a scraper with an aggregator.
#[derive(Clone)]
pub struct Dashboard {
    scraper: Scraper,
    aggregator: Aggregator,
}

impl Dashboard {
    pub fn new(scraper: Scraper, aggregator: Aggregator) -> Self {
        Self { scraper, aggregator }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Scrape and aggregate. Cancellation during the scrape discards the
    /// whole pass; nothing is recorded in history.
    pub async fn refresh(
        &self,
        registrations: &[EndpointRegistration],
        pinned: &[String],
        cancel: watch::Receiver<bool>,
    ) -> Result<DashboardView, ScrapeError> {
        let view = DashboardView {
            endpoint_count: registrations.len(),
            pinned_metrics: pinned.to_vec(),
            services: Vec::new(),
        };
        if registrations.is_empty() {
            return Ok(view);
        }

        let started = Instant::now();
        let reports = self.scraper.scrape_all(registrations, cancel).await?;
        let services = self.aggregator.build_services(&reports, pinned);

        info!(
            endpoints = registrations.len(),
            services = services.len(),
            failed = reports.iter().filter(|r| !r.is_success()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dashboard refreshed"
        );

        Ok(DashboardView { services, ..view })
    }
}
