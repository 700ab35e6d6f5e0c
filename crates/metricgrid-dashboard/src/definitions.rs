//! Metric definition registry.
//!
//! A definition names one dashboard metric: what to call it, how to display
//! it, and which exporter metric names feed it. Fixed definitions are built
//! once at startup; pinned definitions are synthesized per refresh from the
//! user's pinned names. Both go through [`resolve_definition`] so that kind
//! classification and name matching behave identically.

use metricgrid_core::{MetricKind, Snapshot};
use serde::Serialize;

/// A resolved dashboard metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricDefinition {
    /// Stable identifier; also the history value key.
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub kind: MetricKind,
    /// Exporter metric names summed into this definition.
    pub candidate_names: Vec<String>,
}

impl MetricDefinition {
    /// Case-insensitive match of a sample name against the candidates.
    pub fn matches(&self, sample_name: &str) -> bool {
        self.candidate_names
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(sample_name))
    }
}

/// Unresolved definition input. `kind: None` defers to [`classify_kind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionTemplate {
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub kind: Option<MetricKind>,
    pub candidate_names: Vec<String>,
}

impl DefinitionTemplate {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            description: None,
            unit: None,
            kind: None,
            candidate_names: Vec::new(),
        }
    }

    /// Template for a user-pinned metric: key, title, and the single
    /// candidate name are all `name`.
    pub fn pinned(name: &str, help: Option<&str>) -> Self {
        Self {
            description: help.map(str::to_string),
            candidate_names: vec![name.to_string()],
            ..Self::new(name, name)
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn kind(mut self, kind: MetricKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_names.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Classify a metric from its exporter-declared type and its name.
///
/// A declared `counter` type wins; otherwise a `_total` or `_count` suffix
/// marks a counter. Everything else is a gauge.
pub fn classify_kind(metric_name: &str, declared_type: Option<&str>) -> MetricKind {
    if declared_type.is_some_and(|t| t.eq_ignore_ascii_case("counter")) {
        return MetricKind::Counter;
    }

    let lower = metric_name.to_ascii_lowercase();
    if lower.ends_with("_total") || lower.ends_with("_count") {
        return MetricKind::Counter;
    }

    MetricKind::Gauge
}

/// Turn a template into a definition.
///
/// An explicit template kind is kept. Otherwise the kind is classified from
/// the template key and `declared_type`. A template with no candidate names
/// matches its own key.
pub fn resolve_definition(template: DefinitionTemplate, declared_type: Option<&str>) -> MetricDefinition {
    let kind = template
        .kind
        .unwrap_or_else(|| classify_kind(&template.key, declared_type));

    let candidate_names = if template.candidate_names.is_empty() {
        vec![template.key.clone()]
    } else {
        template.candidate_names
    };

    MetricDefinition {
        key: template.key,
        title: template.title,
        description: template.description,
        unit: template.unit,
        kind,
        candidate_names,
    }
}

/// Synthesize definitions for pinned metric names.
///
/// Help text and declared type come from the first snapshot, in slice order,
/// whose metadata has an entry for the name.
pub fn pinned_definitions(pinned: &[String], snapshots: &[&Snapshot]) -> Vec<MetricDefinition> {
    pinned
        .iter()
        .map(|name| {
            let metadata = snapshots.iter().find_map(|s| s.metadata_for(name));
            let help = metadata.and_then(|m| m.help.as_deref());
            let declared_type = metadata.and_then(|m| m.metric_type.as_deref());
            resolve_definition(DefinitionTemplate::pinned(name, help), declared_type)
        })
        .collect()
}

/// Immutable set of fixed dashboard definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: Vec<MetricDefinition>,
}

impl DefinitionRegistry {
    /// Registry built from explicit templates only.
    pub fn new(templates: impl IntoIterator<Item = DefinitionTemplate>) -> Self {
        Self {
            definitions: templates
                .into_iter()
                .map(|t| resolve_definition(t, None))
                .collect(),
        }
    }

    /// Registry holding the standard process and HTTP server definitions.
    pub fn with_defaults() -> Self {
        Self::new(default_templates())
    }

    /// Append further templates. A template whose key is already registered
    /// (case-insensitively) replaces the earlier definition in place.
    pub fn extend(mut self, templates: impl IntoIterator<Item = DefinitionTemplate>) -> Self {
        for definition in templates.into_iter().map(|t| resolve_definition(t, None)) {
            match self
                .definitions
                .iter_mut()
                .find(|d| d.key.eq_ignore_ascii_case(&definition.key))
            {
                Some(existing) => *existing = definition,
                None => self.definitions.push(definition),
            }
        }
        self
    }

    pub fn definitions(&self) -> &[MetricDefinition] {
        &self.definitions
    }

    pub fn get(&self, key: &str) -> Option<&MetricDefinition> {
        self.definitions.iter().find(|d| d.key.eq_ignore_ascii_case(key))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn default_templates() -> Vec<DefinitionTemplate> {
    vec![
        DefinitionTemplate::new("process.cpu.count", "CPU Count")
            .description("Logical CPUs available to the process.")
            .unit("cores")
            .kind(MetricKind::Gauge)
            .names(["process.cpu.count", "process_cpu_count"]),
        DefinitionTemplate::new("process.cpu.time", "CPU Time")
            .description("CPU time consumed by the process.")
            .unit("s")
            .kind(MetricKind::Counter)
            .names([
                "process.cpu.time",
                "process_cpu_seconds_total",
                "process_cpu_time_seconds_total",
                "process_cpu_time",
            ]),
        DefinitionTemplate::new("process.memory.usage", "Resident Memory")
            .description("Resident memory held by the process.")
            .unit("bytes")
            .kind(MetricKind::Gauge)
            .names([
                "process.memory.usage",
                "process_resident_memory_bytes",
                "process_memory_usage_bytes",
                "process_working_set_bytes",
            ]),
        DefinitionTemplate::new("process.thread.count", "Thread Count")
            .description("OS threads in the process.")
            .unit("threads")
            .kind(MetricKind::Gauge)
            .names(["process.thread.count", "process_thread_count", "process_threads"]),
        DefinitionTemplate::new("process.open_fds", "Open File Descriptors")
            .description("File descriptors currently open.")
            .unit("fds")
            .kind(MetricKind::Gauge)
            .names(["process.open_fds", "process_open_fds"]),
        DefinitionTemplate::new("http.server.request.duration", "HTTP Requests")
            .description("Observed HTTP request volume.")
            .unit("requests")
            .kind(MetricKind::Counter)
            .names([
                "http.server.request.duration_count",
                "http_server_request_duration_seconds_count",
                "http_server_requests_total",
                "http_requests_total",
            ]),
        DefinitionTemplate::new("http.server.active_requests", "In-flight Requests")
            .description("HTTP requests currently being served.")
            .unit("requests")
            .kind(MetricKind::Gauge)
            .names(["http.server.active_requests", "http_server_active_requests"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use metricgrid_core::MetricMetadata;
    use std::collections::BTreeMap;

    fn snapshot_with_metadata(entries: &[(&str, Option<&str>, Option<&str>)]) -> Snapshot {
        let metadata = entries
            .iter()
            .map(|(name, metric_type, help)| {
                (
                    name.to_string(),
                    MetricMetadata {
                        metric_type: metric_type.map(str::to_string),
                        help: help.map(str::to_string),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        Snapshot::new(Vec::new(), metadata, String::new(), Utc::now())
    }

    #[test]
    fn classify_by_declared_type() {
        assert_eq!(classify_kind("queue_depth", Some("counter")), MetricKind::Counter);
        assert_eq!(classify_kind("queue_depth", Some("COUNTER")), MetricKind::Counter);
        assert_eq!(classify_kind("queue_depth", Some("gauge")), MetricKind::Gauge);
    }

    #[test]
    fn classify_by_suffix() {
        assert_eq!(classify_kind("queue_depth_total", None), MetricKind::Counter);
        assert_eq!(classify_kind("request_duration_count", None), MetricKind::Counter);
        assert_eq!(classify_kind("Jobs_TOTAL", None), MetricKind::Counter);
        assert_eq!(classify_kind("queue_depth", None), MetricKind::Gauge);
        // Declared non-counter type does not override the suffix rule.
        assert_eq!(classify_kind("things_total", Some("gauge")), MetricKind::Counter);
    }

    #[test]
    fn pinned_without_metadata() {
        let pinned = vec!["queue_depth_total".to_string(), "queue_depth".to_string()];
        let definitions = pinned_definitions(&pinned, &[]);

        assert_eq!(definitions[0].kind, MetricKind::Counter);
        assert_eq!(definitions[1].kind, MetricKind::Gauge);
        assert_eq!(definitions[1].key, "queue_depth");
        assert_eq!(definitions[1].title, "queue_depth");
        assert_eq!(definitions[1].candidate_names, vec!["queue_depth"]);
        assert!(definitions[1].description.is_none());
        assert!(definitions[1].unit.is_none());
    }

    #[test]
    fn pinned_uses_first_snapshot_with_metadata() {
        let empty = snapshot_with_metadata(&[]);
        let first = snapshot_with_metadata(&[("jobs", Some("counter"), Some("Jobs run"))]);
        let second = snapshot_with_metadata(&[("jobs", Some("gauge"), Some("Other help"))]);

        let definitions = pinned_definitions(&["jobs".to_string()], &[&empty, &first, &second]);

        assert_eq!(definitions[0].kind, MetricKind::Counter);
        assert_eq!(definitions[0].description.as_deref(), Some("Jobs run"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let definition = resolve_definition(
            DefinitionTemplate::new("k", "K").names(["Process_CPU_Count"]),
            None,
        );
        assert!(definition.matches("process_cpu_count"));
        assert!(!definition.matches("process_cpu"));
    }

    #[test]
    fn template_without_names_matches_its_key() {
        let definition = resolve_definition(DefinitionTemplate::new("jobs_total", "Jobs"), None);
        assert_eq!(definition.candidate_names, vec!["jobs_total"]);
        assert_eq!(definition.kind, MetricKind::Counter);
    }

    #[test]
    fn defaults_cover_process_and_http() {
        let registry = DefinitionRegistry::with_defaults();
        assert_eq!(registry.len(), 7);
        assert_eq!(
            registry.get("process.cpu.time").map(|d| d.kind),
            Some(MetricKind::Counter)
        );
        assert!(registry.get("process.open_fds").unwrap().matches("process_open_fds"));
        assert!(
            registry
                .get("http.server.request.duration")
                .unwrap()
                .matches("http_requests_total")
        );
    }

    #[test]
    fn extend_appends_and_replaces() {
        let registry = DefinitionRegistry::with_defaults().extend([
            DefinitionTemplate::new("jobs.processed", "Jobs").names(["jobs_processed_total"]),
            DefinitionTemplate::new("PROCESS.CPU.COUNT", "Cores")
                .kind(MetricKind::Gauge)
                .names(["cores"]),
        ]);

        assert_eq!(registry.len(), 8);
        assert_eq!(registry.definitions()[0].title, "Cores");
        // Classified from the key, which has no counter suffix.
        assert_eq!(registry.get("jobs.processed").unwrap().kind, MetricKind::Gauge);
    }
}
