//! Scrape orchestration — fan out one fetch per endpoint and join.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use metricgrid_core::{EndpointRegistration, ScrapeReport};

use crate::error::{FetchError, ScrapeError};
use crate::fetch::Fetcher;

/// Default per-endpoint timeout.
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

/// Options applied to every endpoint in a pass.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Upper bound on a single fetch, including reading the body.
    pub timeout: Duration,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCRAPE_TIMEOUT,
        }
    }
}

/// Scrapes registered endpoints through an injected [`Fetcher`].
#[derive(Clone)]
pub struct Scraper {
    fetcher: Arc<dyn Fetcher>,
    options: ScrapeOptions,
}

impl Scraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, options: ScrapeOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Scrape every registration concurrently.
    ///
    /// Reports come back in registration order. Per-endpoint failures are
    /// captured in their reports. If `cancel` flips to `true` before all
    /// fetches finish, outstanding fetches are dropped and the whole pass
    /// returns [`ScrapeError::Cancelled`].
    pub async fn scrape_all(
        &self,
        registrations: &[EndpointRegistration],
        mut cancel: watch::Receiver<bool>,
    ) -> Result<Vec<ScrapeReport>, ScrapeError> {
        if *cancel.borrow_and_update() {
            return Err(ScrapeError::Cancelled);
        }

        let started = Instant::now();
        let fan_out = join_all(
            registrations
                .iter()
                .map(|registration| scrape_one(registration, self.fetcher.as_ref(), &self.options)),
        );

        tokio::select! {
            reports = fan_out => {
                let failed = reports.iter().filter(|r| !r.is_success()).count();
                info!(
                    endpoints = reports.len(),
                    failed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "scrape pass complete"
                );
                Ok(reports)
            }
            _ = cancelled(&mut cancel) => {
                debug!(endpoints = registrations.len(), "scrape pass cancelled");
                Err(ScrapeError::Cancelled)
            }
        }
    }
}

/// Resolve once the signal reads `true`. Never resolves if the sender is
/// dropped without cancelling.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Fetch and parse a single endpoint. Never fails: errors become a failed
/// report carrying the error text.
pub async fn scrape_one(
    registration: &EndpointRegistration,
    fetcher: &dyn Fetcher,
    options: &ScrapeOptions,
) -> ScrapeReport {
    let started = Instant::now();
    let url = registration.endpoint_url.as_str();

    let fetched = match tokio::time::timeout(options.timeout, fetcher.fetch(url)).await {
        Ok(Ok(response)) if response.is_success() => Ok(response.body),
        Ok(Ok(response)) => Err(FetchError::Status(response.status)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(FetchError::Timeout(options.timeout)),
    };

    match fetched {
        Ok(body) => {
            let snapshot = metricgrid_exposition::parse(&body);
            let duration = started.elapsed();
            debug!(
                service = %registration.service_name,
                instance = %registration.instance_name,
                %url,
                samples = snapshot.samples().len(),
                duration_ms = duration.as_millis() as u64,
                "scrape succeeded"
            );
            ScrapeReport::success(registration.clone(), snapshot, duration)
        }
        Err(e) => {
            let duration = started.elapsed();
            warn!(
                service = %registration.service_name,
                instance = %registration.instance_name,
                %url,
                error = %e,
                "scrape failed"
            );
            ScrapeReport::failure(registration.clone(), e.to_string(), duration)
        }
    }
}
