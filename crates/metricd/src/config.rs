//! metricd.toml configuration.
//!
//! The file is deserialized as written, then [`MetricdConfig::resolve`]
//! validates it and turns it into the typed [`Settings`] the core crates
//! consume.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use metricgrid_core::{EndpointRegistration, MetricKind};
use metricgrid_dashboard::{DefinitionRegistry, DefinitionTemplate, PinnedMetrics};
use metricgrid_history::DEFAULT_MAX_POINTS;
use metricgrid_scrape::DEFAULT_SCRAPE_TIMEOUT;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("history.max_points must be at least 1")]
    ZeroCapacity,

    #[error("endpoint #{index} has an empty {field}")]
    EmptyIdentity { index: usize, field: &'static str },

    #[error("dashboard definition #{index} has an empty key")]
    EmptyDefinitionKey { index: usize },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricdConfig {
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeConfig {
    pub timeout: Option<String>,
    pub refresh_interval: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryConfig {
    pub max_points: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub pinned: Vec<String>,
    #[serde(default)]
    pub definitions: Vec<DefinitionConfig>,
}

/// Extra fixed dashboard definition.
#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionConfig {
    pub key: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub kind: Option<MetricKind>,
    #[serde(default)]
    pub metric_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub service: String,
    pub instance: String,
    pub url: String,
}

/// Validated, typed configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub scrape_timeout: Duration,
    pub refresh_interval: Duration,
    pub max_points: usize,
    pub registrations: Vec<EndpointRegistration>,
    pub registry: DefinitionRegistry,
    pub pinned: PinnedMetrics,
}

impl MetricdConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let scrape_timeout = duration_field("scrape.timeout", self.scrape.timeout.as_deref())?
            .unwrap_or(DEFAULT_SCRAPE_TIMEOUT);
        let refresh_interval =
            duration_field("scrape.refresh_interval", self.scrape.refresh_interval.as_deref())?
                .unwrap_or(DEFAULT_REFRESH_INTERVAL);

        let max_points = self.history.max_points.unwrap_or(DEFAULT_MAX_POINTS);
        if max_points == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        let mut registrations = Vec::with_capacity(self.endpoints.len());
        for (index, endpoint) in self.endpoints.into_iter().enumerate() {
            for (field, value) in [
                ("service", &endpoint.service),
                ("instance", &endpoint.instance),
                ("url", &endpoint.url),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::EmptyIdentity { index, field });
                }
            }
            registrations.push(EndpointRegistration::new(
                endpoint.service.trim(),
                endpoint.instance.trim(),
                endpoint.url.trim(),
            ));
        }

        let mut templates = Vec::with_capacity(self.dashboard.definitions.len());
        for (index, definition) in self.dashboard.definitions.into_iter().enumerate() {
            if definition.key.trim().is_empty() {
                return Err(ConfigError::EmptyDefinitionKey { index });
            }
            templates.push(definition.into_template());
        }

        Ok(Settings {
            scrape_timeout,
            refresh_interval,
            max_points,
            registrations,
            registry: DefinitionRegistry::with_defaults().extend(templates),
            pinned: self.dashboard.pinned.iter().collect(),
        })
    }
}

impl DefinitionConfig {
    fn into_template(self) -> DefinitionTemplate {
        let key = self.key.trim().to_string();
        let title = self.title.unwrap_or_else(|| key.clone());
        DefinitionTemplate {
            key,
            title,
            description: self.description,
            unit: self.unit,
            kind: self.kind,
            candidate_names: self.metric_names,
        }
    }
}

fn duration_field(field: &'static str, value: Option<&str>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|raw| {
            parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
                field,
                value: raw.to_string(),
            })
        })
        .transpose()
}

/// Parse a duration string like "5s", "500ms", "1m". Plain numbers are
/// seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
