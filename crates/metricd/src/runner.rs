//! Scrape and refresh drivers for the CLI subcommands.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use metricgrid_dashboard::{Aggregator, Dashboard, DashboardView};
use metricgrid_exposition::render_scrape_metrics;
use metricgrid_history::HistoryStore;
use metricgrid_scrape::{ScrapeError, ScrapeOptions, Scraper};

use crate::OutputFormat;
use crate::config::Settings;
use crate::http_fetch::HttpFetcher;

fn build(settings: &Settings) -> (Scraper, Aggregator) {
    let scraper = Scraper::new(
        Arc::new(HttpFetcher::new()),
        ScrapeOptions {
            timeout: settings.scrape_timeout,
        },
    );
    let aggregator = Aggregator::new(
        Arc::new(settings.registry.clone()),
        Arc::new(HistoryStore::new(settings.max_points)),
    );
    (scraper, aggregator)
}

/// Flip the returned signal to `true` on Ctrl-C.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "failed to install Ctrl-C handler");
                // Keep the sender alive so receivers never see a closed channel.
                std::future::pending::<()>().await;
            }
        }
    });
    shutdown_rx
}

/// One scrape pass, printed to stdout.
pub async fn scrape_once(settings: Settings, format: OutputFormat) -> anyhow::Result<()> {
    let (scraper, aggregator) = build(&settings);
    let shutdown = shutdown_signal();

    let reports = match scraper.scrape_all(&settings.registrations, shutdown).await {
        Ok(reports) => reports,
        Err(ScrapeError::Cancelled) => {
            info!("scrape cancelled");
            return Ok(());
        }
    };

    match format {
        OutputFormat::Exposition => print!("{}", render_scrape_metrics(&reports)),
        OutputFormat::Json => {
            let view = DashboardView {
                endpoint_count: settings.registrations.len(),
                pinned_metrics: settings.pinned.names().to_vec(),
                services: aggregator.build_services(&reports, settings.pinned.names()),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}

/// Refresh until shutdown, logging a summary per service after each pass.
pub async fn watch(settings: Settings, print: bool) -> anyhow::Result<()> {
    let (scraper, aggregator) = build(&settings);
    let dashboard = Dashboard::new(scraper, aggregator);
    let mut shutdown = shutdown_signal();

    info!(
        interval_ms = settings.refresh_interval.as_millis() as u64,
        endpoints = settings.registrations.len(),
        "refresh loop started"
    );

    loop {
        match dashboard
            .refresh(&settings.registrations, settings.pinned.names(), shutdown.clone())
            .await
        {
            Ok(view) => {
                log_summary(&view);
                if print {
                    println!("{}", serde_json::to_string(&view)?);
                }
            }
            Err(ScrapeError::Cancelled) => break,
        }

        tokio::select! {
            _ = tokio::time::sleep(settings.refresh_interval) => {}
            _ = shutdown.changed() => break,
        }
    }

    info!("refresh loop stopped");
    Ok(())
}

fn log_summary(view: &DashboardView) {
    for service in &view.services {
        let aggregate = &service.aggregate;
        info!(
            service = %service.service_name,
            instances = aggregate.instance_count,
            failed = aggregate.failed_instances,
            samples = aggregate.total_samples,
            avg_scrape_ms = aggregate.average_scrape_duration_ms,
            cards = aggregate.cards.len() + aggregate.pinned_cards.len(),
            charts = aggregate.charts.len() + aggregate.pinned_charts.len(),
            "service refreshed"
        );
    }
}
