//! Dashboard aggregation — turns scrape reports into instance and service
//! views, recording instant values in the history store on the way.
//!
//! Every build writes the current instant values for its scope before it
//! reads that scope's history back, so cards and charts always include the
//! point just recorded.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use metricgrid_core::{EndpointRegistration, MetricKind, MetricMetadata, ScrapeReport, Snapshot};
use metricgrid_history::{HistoryPoint, HistoryStore};

use crate::definitions::{DefinitionRegistry, MetricDefinition, pinned_definitions};
use crate::series::{
    accumulate, chart_id, format_labels, format_value, gauge_series, instant_values, parse_finite,
    rate_series, rate_unit,
};
use crate::views::{
    DashboardCard, DashboardChart, InstanceAggregate, SampleRow, SeriesSummary, ServiceAggregate,
    ServiceView,
};

/// Maximum rows in a sample table.
pub const SAMPLE_LIMIT: usize = 200;

/// History key for one endpoint.
pub fn instance_history_key(registration: &EndpointRegistration) -> String {
    format!(
        "instance:{}:{}:{}",
        registration.service_name, registration.instance_name, registration.endpoint_url
    )
}

/// History key for a service roll-up.
pub fn service_history_key(service_name: &str) -> String {
    format!("service:{service_name}")
}

/// Builds dashboard views from scrape reports.
#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<DefinitionRegistry>,
    history: Arc<HistoryStore>,
}

impl Aggregator {
    pub fn new(registry: Arc<DefinitionRegistry>, history: Arc<HistoryStore>) -> Self {
        Self { registry, history }
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Group reports by service name (case-insensitively, first spelling
    /// wins) and build each service. Services are ordered by name.
    pub fn build_services(&self, reports: &[ScrapeReport], pinned: &[String]) -> Vec<ServiceView> {
        let mut groups: Vec<(String, Vec<&ScrapeReport>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for report in reports {
            let name = &report.registration.service_name;
            let slot = *index.entry(name.to_lowercase()).or_insert_with(|| {
                groups.push((name.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(report);
        }

        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups
            .into_iter()
            .map(|(name, reports)| self.build_service(&name, &reports, pinned))
            .collect()
    }

    /// Build one service: its roll-up plus every instance, ordered by
    /// instance name.
    pub fn build_service(&self, service_name: &str, reports: &[&ScrapeReport], pinned: &[String]) -> ServiceView {
        let snapshots = successful_snapshots(reports);
        let pinned = pinned_definitions(pinned, &snapshots);

        let aggregate = self.build_aggregate(service_name, reports, &snapshots, &pinned);

        let mut instances: Vec<InstanceAggregate> = reports
            .iter()
            .map(|report| self.build_instance(report, &pinned))
            .collect();
        instances.sort_by(|a, b| a.registration.instance_name.cmp(&b.registration.instance_name));

        ServiceView {
            service_name: service_name.to_string(),
            aggregate,
            instances,
        }
    }

    /// Build the view of one endpoint.
    ///
    /// A failed report yields an empty view carrying the error text.
    pub fn build_instance(&self, report: &ScrapeReport, pinned: &[MetricDefinition]) -> InstanceAggregate {
        let registration = report.registration.clone();
        let scrape_duration_ms = duration_ms(report);

        let Some(snapshot) = report.snapshot() else {
            debug!(
                service = %registration.service_name,
                instance = %registration.instance_name,
                error = report.error().unwrap_or_default(),
                "instance has no snapshot"
            );
            return InstanceAggregate {
                registration,
                retrieved_at: None,
                error: report.error().map(str::to_string),
                scrape_duration_ms,
                cards: Vec::new(),
                charts: Vec::new(),
                pinned_cards: Vec::new(),
                pinned_charts: Vec::new(),
                series: Vec::new(),
                samples: Vec::new(),
                total_samples: 0,
            };
        };

        let fixed_values = instant_values(snapshot, self.registry.definitions());
        let pinned_values = instant_values(snapshot, pinned);
        let mut values = fixed_values.clone();
        accumulate(&mut values, pinned_values.clone());

        let scope = instance_history_key(&registration);
        let history = self.record_and_read(&scope, snapshot.retrieved_at(), values);

        let series = summarize_series(std::iter::once(snapshot), |name| snapshot.metadata_for(name));
        let samples = snapshot
            .samples()
            .iter()
            .take(SAMPLE_LIMIT)
            .map(|sample| {
                let metadata = snapshot.metadata_for(&sample.name);
                SampleRow {
                    name: sample.name.clone(),
                    labels: format_labels(&sample.labels),
                    value: sample.value.clone(),
                    metric_type: metadata.and_then(|m| m.metric_type.clone()),
                    help: metadata.and_then(|m| m.help.clone()),
                }
            })
            .collect();

        InstanceAggregate {
            retrieved_at: Some(snapshot.retrieved_at()),
            error: None,
            scrape_duration_ms,
            cards: build_cards(&fixed_values, &history, self.registry.definitions()),
            charts: build_charts(&history, &scope, self.registry.definitions()),
            pinned_cards: build_cards(&pinned_values, &history, pinned),
            pinned_charts: build_charts(&history, &scope, pinned),
            series,
            samples,
            total_samples: snapshot.samples().len(),
            registration,
        }
    }

    fn build_aggregate(
        &self,
        service_name: &str,
        reports: &[&ScrapeReport],
        snapshots: &[&Snapshot],
        pinned: &[MetricDefinition],
    ) -> ServiceAggregate {
        let mut fixed_values = BTreeMap::new();
        let mut pinned_values = BTreeMap::new();
        for snapshot in snapshots {
            accumulate(&mut fixed_values, instant_values(snapshot, self.registry.definitions()));
            accumulate(&mut pinned_values, instant_values(snapshot, pinned));
        }
        let mut values = fixed_values.clone();
        accumulate(&mut values, pinned_values.clone());

        let latest_scrape = snapshots.iter().map(|s| s.retrieved_at()).max();
        let scope = service_history_key(service_name);
        let history = self.record_and_read(&scope, latest_scrape.unwrap_or_else(Utc::now), values);

        let metadata = first_seen_metadata(snapshots);
        let lookup = |name: &str| metadata.get(name).copied();

        let instance_count = reports.len();
        let successful_instances = snapshots.len();
        let average_scrape_duration_ms = if instance_count > 0 {
            reports.iter().map(|r| duration_ms(r)).sum::<f64>() / instance_count as f64
        } else {
            0.0
        };

        ServiceAggregate {
            cards: build_cards(&fixed_values, &history, self.registry.definitions()),
            charts: build_charts(&history, &scope, self.registry.definitions()),
            pinned_cards: build_cards(&pinned_values, &history, pinned),
            pinned_charts: build_charts(&history, &scope, pinned),
            series: summarize_series(snapshots.iter().copied(), lookup),
            samples: aggregate_samples(snapshots, lookup),
            total_samples: snapshots.iter().map(|s| s.samples().len()).sum(),
            instance_count,
            successful_instances,
            failed_instances: instance_count - successful_instances,
            average_scrape_duration_ms,
            latest_scrape,
        }
    }

    /// Append `values` under `scope` (when non-empty) and read the scope back.
    fn record_and_read(
        &self,
        scope: &str,
        timestamp: DateTime<Utc>,
        values: BTreeMap<String, f64>,
    ) -> Vec<HistoryPoint> {
        if !values.is_empty() {
            self.history.add_snapshot(scope, timestamp, values);
        }
        self.history.history(scope)
    }
}

fn successful_snapshots<'a>(reports: &[&'a ScrapeReport]) -> Vec<&'a Snapshot> {
    reports.iter().filter_map(|r| r.snapshot()).collect()
}

fn duration_ms(report: &ScrapeReport) -> f64 {
    report.duration.as_secs_f64() * 1000.0
}

/// Metadata per name from the first snapshot that declares it.
fn first_seen_metadata<'a>(snapshots: &[&'a Snapshot]) -> HashMap<&'a str, &'a MetricMetadata> {
    let mut metadata = HashMap::new();
    for snapshot in snapshots {
        for (name, meta) in snapshot.metadata() {
            metadata.entry(name.as_str()).or_insert(meta);
        }
    }
    metadata
}

/// Cards for definitions that have a current value, in definition order.
fn build_cards(
    values: &BTreeMap<String, f64>,
    history: &[HistoryPoint],
    definitions: &[MetricDefinition],
) -> Vec<DashboardCard> {
    definitions
        .iter()
        .filter_map(|definition| {
            let current = *values.get(&definition.key)?;
            let value = match definition.kind {
                MetricKind::Counter => match rate_series(history, &definition.key).last() {
                    Some(rate) => format!("{:.2} {}", rate.value, rate_unit(definition.unit.as_deref())),
                    None => "n/a".to_string(),
                },
                MetricKind::Gauge => format_value(current, definition.unit.as_deref()),
            };
            Some(DashboardCard {
                title: definition.title.clone(),
                value,
                unit: definition.unit.clone(),
                description: definition.description.clone(),
            })
        })
        .collect()
}

/// Charts for definitions whose derived series has at least two points.
fn build_charts(history: &[HistoryPoint], scope: &str, definitions: &[MetricDefinition]) -> Vec<DashboardChart> {
    if history.len() < 2 {
        return Vec::new();
    }

    definitions
        .iter()
        .filter_map(|definition| {
            let (points, unit, is_rate) = match definition.kind {
                MetricKind::Counter => (
                    rate_series(history, &definition.key),
                    rate_unit(definition.unit.as_deref()),
                    true,
                ),
                MetricKind::Gauge => (
                    gauge_series(history, &definition.key),
                    definition.unit.clone().unwrap_or_default(),
                    false,
                ),
            };
            (points.len() >= 2).then(|| DashboardChart {
                id: chart_id(scope, &definition.key),
                title: definition.title.clone(),
                unit,
                is_rate,
                points,
            })
        })
        .collect()
}

/// Series count per metric name; count descending, then name ascending.
fn summarize_series<'a, 'm>(
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
    metadata: impl Fn(&str) -> Option<&'m MetricMetadata>,
) -> Vec<SeriesSummary> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for snapshot in snapshots {
        for sample in snapshot.samples() {
            *counts.entry(sample.name.as_str()).or_insert(0) += 1;
        }
    }

    let mut summaries: Vec<SeriesSummary> = counts
        .into_iter()
        .map(|(name, series_count)| {
            let meta = metadata(name);
            SeriesSummary {
                name: name.to_string(),
                metric_type: meta.and_then(|m| m.metric_type.clone()),
                help: meta.and_then(|m| m.help.clone()),
                series_count,
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.series_count.cmp(&a.series_count).then_with(|| a.name.cmp(&b.name)));
    summaries
}

/// Sum samples sharing a name and label set across snapshots; largest sums
/// first, capped at [`SAMPLE_LIMIT`]. Unparseable values count as zero.
fn aggregate_samples<'m>(
    snapshots: &[&Snapshot],
    metadata: impl Fn(&str) -> Option<&'m MetricMetadata>,
) -> Vec<SampleRow> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut sums: HashMap<(String, String), f64> = HashMap::new();

    for snapshot in snapshots {
        for sample in snapshot.samples() {
            let key = (sample.name.clone(), format_labels(&sample.labels));
            let value = parse_finite(&sample.value).unwrap_or(0.0);
            match sums.get_mut(&key) {
                Some(sum) => *sum += value,
                None => {
                    order.push(key.clone());
                    sums.insert(key, value);
                }
            }
        }
    }

    let mut rows: Vec<((String, String), f64)> = order
        .into_iter()
        .map(|key| {
            let sum = sums.get(&key).copied().unwrap_or_default();
            (key, sum)
        })
        .collect();
    // Stable sort keeps first-seen order among equal sums.
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    rows.into_iter()
        .take(SAMPLE_LIMIT)
        .map(|((name, labels), sum)| {
            let meta = metadata(&name);
            SampleRow {
                metric_type: meta.and_then(|m| m.metric_type.clone()),
                help: meta.and_then(|m| m.help.clone()),
                value: format!("{sum:.2}"),
                name,
                labels,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use metricgrid_exposition::parse_at;
    use std::time::Duration;

    fn aggregator() -> Aggregator {
        Aggregator::new(
            Arc::new(DefinitionRegistry::with_defaults()),
            Arc::new(HistoryStore::new(10)),
        )
    }

    fn ok(service: &str, instance: &str, payload: &str, at: DateTime<Utc>, ms: u64) -> ScrapeReport {
        ScrapeReport::success(
            EndpointRegistration::new(service, instance, format!("http://{instance}/metrics")),
            parse_at(payload, at),
            Duration::from_millis(ms),
        )
    }

    fn failed(service: &str, instance: &str, ms: u64) -> ScrapeReport {
        ScrapeReport::failure(
            EndpointRegistration::new(service, instance, format!("http://{instance}/metrics")),
            "unexpected status 500",
            Duration::from_millis(ms),
        )
    }

    #[test]
    fn failed_instance_counts_but_contributes_nothing() {
        let agg = aggregator();
        let now = Utc::now();
        let reports = vec![
            failed("api", "api-1", 100),
            ok("api", "api-2", "process_open_fds 12\nprocess_threads 4", now, 300),
        ];

        let services = agg.build_services(&reports, &[]);
        assert_eq!(services.len(), 1);
        let aggregate = &services[0].aggregate;

        assert_eq!(aggregate.instance_count, 2);
        assert_eq!(aggregate.failed_instances, 1);
        assert_eq!(aggregate.successful_instances, 1);
        assert_eq!(aggregate.total_samples, 2);
        assert_eq!(aggregate.average_scrape_duration_ms, 200.0);
        assert_eq!(aggregate.latest_scrape, Some(now));

        let failed_view = &services[0].instances[0];
        assert_eq!(failed_view.registration.instance_name, "api-1");
        assert!(failed_view.cards.is_empty());
        assert_eq!(failed_view.total_samples, 0);
        assert_eq!(failed_view.error.as_deref(), Some("unexpected status 500"));
    }

    #[test]
    fn gauge_cards_format_value_and_unit() {
        let agg = aggregator();
        let reports = vec![ok("api", "a", "process_open_fds 12\nprocess_open_fds 0.5", Utc::now(), 1)];

        let services = agg.build_services(&reports, &[]);
        let card = &services[0].aggregate.cards[0];

        assert_eq!(card.title, "Open File Descriptors");
        assert_eq!(card.value, "12.50 fds");
    }

    #[test]
    fn counter_card_needs_two_points() {
        let agg = aggregator();
        let t0 = Utc::now();

        let first = agg.build_services(&[ok("api", "a", "http_requests_total 100", t0, 1)], &[]);
        assert_eq!(first[0].aggregate.cards[0].value, "n/a");
        assert!(first[0].aggregate.charts.is_empty());

        let second = agg.build_services(
            &[ok("api", "a", "http_requests_total 150", t0 + ChronoDuration::seconds(10), 1)],
            &[],
        );
        assert_eq!(second[0].aggregate.cards[0].value, "5.00 requests/s");
        // One rate point is not enough for a chart.
        assert!(second[0].aggregate.charts.is_empty());
    }

    #[test]
    fn charts_appear_with_enough_history() {
        let agg = aggregator();
        let t0 = Utc::now();
        for i in 0..3i64 {
            agg.build_services(
                &[ok(
                    "api",
                    "a",
                    &format!("http_requests_total {}\nprocess_open_fds {}", 100 + i * 10, 5 + i),
                    t0 + ChronoDuration::seconds(i * 5),
                    1,
                )],
                &[],
            );
        }

        let history = agg.history().history("service:api");
        assert_eq!(history.len(), 3);

        let services = agg.build_services(
            &[ok(
                "api",
                "a",
                "http_requests_total 130\nprocess_open_fds 8",
                t0 + ChronoDuration::seconds(15),
                1,
            )],
            &[],
        );
        let charts = &services[0].aggregate.charts;
        let ids: Vec<&str> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["service-api-process-open-fds", "service-api-http-server-request-duration"]
        );

        let rate = &charts[1];
        assert!(rate.is_rate);
        assert_eq!(rate.unit, "requests/s");
        assert_eq!(rate.points.len(), 3);
        assert!(rate.points.iter().all(|p| p.value == 2.0));

        let gauge = &charts[0];
        assert!(!gauge.is_rate);
        assert_eq!(gauge.unit, "fds");
        assert_eq!(gauge.points.len(), 4);
    }

    #[test]
    fn nothing_recorded_without_values() {
        let agg = aggregator();
        agg.build_services(&[ok("api", "a", "unrelated_metric 1", Utc::now(), 1)], &[]);
        agg.build_services(&[failed("web", "w", 1)], &[]);
        assert!(agg.history().keys().is_empty());
    }

    #[test]
    fn instance_and_service_keys_are_recorded() {
        let agg = aggregator();
        agg.build_services(&[ok("api", "a", "process_open_fds 1", Utc::now(), 1)], &[]);
        assert_eq!(
            agg.history().keys(),
            vec!["instance:api:a:http://a/metrics".to_string(), "service:api".to_string()]
        );
    }

    #[test]
    fn services_group_case_insensitively() {
        let agg = aggregator();
        let now = Utc::now();
        let reports = vec![
            ok("Web", "w-2", "up 1", now, 1),
            ok("api", "a-1", "up 1", now, 1),
            ok("WEB", "w-1", "up 1", now, 1),
        ];

        let services = agg.build_services(&reports, &[]);
        let names: Vec<&str> = services.iter().map(|s| s.service_name.as_str()).collect();
        assert_eq!(names, vec!["Web", "api"]);

        let instances: Vec<&str> = services[0]
            .instances
            .iter()
            .map(|i| i.registration.instance_name.as_str())
            .collect();
        assert_eq!(instances, vec!["w-1", "w-2"]);
        assert_eq!(services[0].aggregate.instance_count, 2);
    }

    #[test]
    fn pinned_metrics_get_their_own_cards() {
        let agg = aggregator();
        let t0 = Utc::now();
        let pinned = vec!["queue_depth".to_string(), "jobs_done_total".to_string()];
        let payload = "# HELP queue_depth Items waiting\nqueue_depth 7\njobs_done_total 10";

        let services = agg.build_services(&[ok("api", "a", payload, t0, 1)], &pinned);
        let cards = &services[0].aggregate.pinned_cards;

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "queue_depth");
        assert_eq!(cards[0].value, "7.00");
        assert_eq!(cards[0].description.as_deref(), Some("Items waiting"));
        assert_eq!(cards[1].value, "n/a");

        let instance = &services[0].instances[0];
        assert_eq!(instance.pinned_cards.len(), 2);
        assert!(instance.cards.is_empty());
    }

    #[test]
    fn series_summary_orders_by_count_then_name() {
        let agg = aggregator();
        let now = Utc::now();
        let reports = vec![
            ok("api", "a", "# TYPE b counter\nb{x=\"1\"} 1\nb{x=\"2\"} 1\na 1", now, 1),
            ok("api", "b", "# TYPE b gauge\nc 1\na 2", now, 1),
        ];

        let services = agg.build_services(&reports, &[]);
        let series = &services[0].aggregate.series;
        let names: Vec<(&str, usize)> = series.iter().map(|s| (s.name.as_str(), s.series_count)).collect();
        assert_eq!(names, vec![("a", 2), ("b", 2), ("c", 1)]);
        // First snapshot declaring the metric wins.
        assert_eq!(series[1].metric_type.as_deref(), Some("counter"));
    }

    #[test]
    fn sample_table_sums_by_name_and_labels() {
        let agg = aggregator();
        let now = Utc::now();
        let reports = vec![
            ok("api", "a", "req{code=\"200\"} 10\nreq{code=\"500\"} 1\nmem bogus", now, 1),
            ok("api", "b", "req{code=\"200\"} 5.5\nreq 3", now, 1),
        ];

        let services = agg.build_services(&reports, &[]);
        let rows: Vec<(&str, &str, &str)> = services[0]
            .aggregate
            .samples
            .iter()
            .map(|r| (r.name.as_str(), r.labels.as_str(), r.value.as_str()))
            .collect();

        assert_eq!(
            rows,
            vec![
                ("req", "code=\"200\"", "15.50"),
                ("req", "none", "3.00"),
                ("req", "code=\"500\"", "1.00"),
                ("mem", "none", "0.00"),
            ]
        );
    }

    #[test]
    fn sample_tables_are_capped() {
        let agg = aggregator();
        let payload: String = (0..250).map(|i| format!("m{{i=\"{i}\"}} {i}\n")).collect();
        let services = agg.build_services(&[ok("api", "a", &payload, Utc::now(), 1)], &[]);

        let aggregate = &services[0].aggregate;
        assert_eq!(aggregate.samples.len(), SAMPLE_LIMIT);
        assert_eq!(aggregate.samples[0].value, "249.00");
        assert_eq!(aggregate.total_samples, 250);

        let instance = &services[0].instances[0];
        assert_eq!(instance.samples.len(), SAMPLE_LIMIT);
        // Instance rows keep payload order and raw values.
        assert_eq!(instance.samples[0].value, "0");
        assert_eq!(instance.total_samples, 250);
    }

    #[test]
    fn empty_report_list() {
        assert!(aggregator().build_services(&[], &[]).is_empty());
    }
}
