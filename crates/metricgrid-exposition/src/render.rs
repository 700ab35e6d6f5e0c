//! Exposition rendering of the scraper's own results.
//!
//! Produces one gauge family per scrape property, labelled by `service` and
//! `instance`, so that a metricgrid process can itself be scraped.

use std::fmt::Write;

use metricgrid_core::ScrapeReport;

/// Render per-endpoint scrape results in the exposition text format.
pub fn render_scrape_metrics(reports: &[ScrapeReport]) -> String {
    let mut out = String::new();

    write_family(
        &mut out,
        "metricgrid_scrape_up",
        "Whether the last scrape of the endpoint succeeded (1) or failed (0).",
        reports,
        |r| if r.is_success() { "1".to_string() } else { "0".to_string() },
    );

    write_family(
        &mut out,
        "metricgrid_scrape_duration_seconds",
        "Wall-clock duration of the last scrape.",
        reports,
        |r| format!("{:.6}", r.duration.as_secs_f64()),
    );

    write_family(
        &mut out,
        "metricgrid_scrape_samples",
        "Number of samples parsed from the last successful scrape.",
        reports,
        |r| r.snapshot().map_or(0, |s| s.samples().len()).to_string(),
    );

    out
}

fn write_family(
    out: &mut String,
    name: &str,
    help: &str,
    reports: &[ScrapeReport],
    value: impl Fn(&ScrapeReport) -> String,
) {
    let _ = writeln!(out, "# HELP {name} {}", escape_help(help));
    let _ = writeln!(out, "# TYPE {name} gauge");
    for report in reports {
        let _ = writeln!(
            out,
            "{name}{{service=\"{}\",instance=\"{}\"}} {}",
            escape_label_value(&report.registration.service_name),
            escape_label_value(&report.registration.instance_name),
            value(report)
        );
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
