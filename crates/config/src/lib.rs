// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Typed monitoring settings.
//!
//! Configuration is loaded by an external collaborator (file, environment,
//! flags) and handed to the core as the [`MonitoringSettings`] value defined
//! here. Every field carries a serde default, so a partial document
//! deserializes into a complete, sensible configuration. The core validates
//! the value it receives at start; see [`validation`].

pub mod error;
pub mod validation;

pub use error::Error;
pub use validation::validate;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root settings for the observability core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringSettings {
    /// Master switch; when off, the whole core becomes a no-op.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: debug, info, warn, error, or fatal.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metric store settings.
    #[serde(default)]
    pub metrics: MetricsSettings,
    /// Health monitor settings.
    #[serde(default)]
    pub health: HealthSettings,
    /// Alert engine settings.
    #[serde(default)]
    pub alerting: AlertingSettings,
    /// Sampling knobs.
    #[serde(default)]
    pub performance: PerformanceSettings,
    /// Admin HTTP surface settings.
    #[serde(default)]
    pub admin: AdminSettings,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: default_log_level(),
            metrics: MetricsSettings::default(),
            health: HealthSettings::default(),
            alerting: AlertingSettings::default(),
            performance: PerformanceSettings::default(),
            admin: AdminSettings::default(),
        }
    }
}

/// Metric store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSettings {
    /// Whether the store accepts observations.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Flush sink path; `None` disables flushing.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// How often the background flusher writes the sink.
    #[serde(with = "humantime_serde", default = "default_flush_interval")]
    pub flush_interval: Duration,
    /// Optional prefix prepended to every series name.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Maximum number of live series.
    #[serde(default = "default_max_series")]
    pub max_series: usize,
    /// Histogram bucket upper bounds.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            output_path: None,
            flush_interval: default_flush_interval(),
            prefix: None,
            max_series: default_max_series(),
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

/// Health monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthSettings {
    /// Whether background health runs happen at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval between background runs.
    #[serde(with = "humantime_serde", default = "default_check_interval")]
    pub check_interval: Duration,
    /// Default per-check timeout.
    #[serde(with = "humantime_serde", default = "default_check_timeout")]
    pub check_timeout: Duration,
    /// Consecutive failures before recovery may fire.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Filesystem writability check.
    #[serde(default = "default_filesystem_check")]
    pub filesystem: BuiltinCheckSettings,
    /// Memory pressure check.
    #[serde(default)]
    pub memory: BuiltinCheckSettings,
    /// Runtime task count check.
    #[serde(default)]
    pub tasks: BuiltinCheckSettings,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: default_check_interval(),
            check_timeout: default_check_timeout(),
            failure_threshold: default_failure_threshold(),
            filesystem: default_filesystem_check(),
            memory: BuiltinCheckSettings::default(),
            tasks: BuiltinCheckSettings::default(),
        }
    }
}

/// Per built-in check knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuiltinCheckSettings {
    /// Whether the check is registered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether an unhealthy reading forces the aggregate unhealthy.
    #[serde(default)]
    pub critical: bool,
    /// Per-check timeout.
    #[serde(with = "humantime_serde", default = "default_check_timeout")]
    pub timeout: Duration,
}

impl Default for BuiltinCheckSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            critical: false,
            timeout: default_check_timeout(),
        }
    }
}

/// Alert engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertingSettings {
    /// Whether rule evaluation runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Default cooldown for rules that do not set their own.
    #[serde(with = "humantime_serde", default = "default_alert_cooldown")]
    pub cooldown: Duration,
    /// How often the engine samples the metric store.
    #[serde(with = "humantime_serde", default = "default_evaluation_interval")]
    pub evaluation_interval: Duration,
    /// Extra rules registered alongside the default set.
    #[serde(default)]
    pub rules: Vec<AlertRuleSettings>,
    /// Delivery channels.
    #[serde(default)]
    pub channels: Vec<ChannelSettings>,
    /// Threshold knobs consumed by the default rules.
    #[serde(default)]
    pub thresholds: ThresholdSettings,
}

impl Default for AlertingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown: default_alert_cooldown(),
            evaluation_interval: default_evaluation_interval(),
            rules: Vec::new(),
            channels: Vec::new(),
            thresholds: ThresholdSettings::default(),
        }
    }
}

/// One declarative rule, as configured.
///
/// Operator and severity are validated strings here; the core converts them
/// into its own types after validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertRuleSettings {
    /// Rule name; doubles as the alert identity.
    pub name: String,
    /// Target metric name.
    pub metric: String,
    /// Label matcher.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// One of: gt, gte, lt, lte, eq, ne, exists.
    pub op: String,
    /// Threshold the observed value is compared against.
    #[serde(default)]
    pub threshold: f64,
    /// One of: info, warning, critical.
    pub severity: String,
    /// Message carried by alerts raised by this rule.
    pub message: String,
    /// Per-rule cooldown; falls back to `alerting.cooldown` when absent.
    #[serde(with = "humantime_serde", default)]
    pub cooldown: Option<Duration>,
    /// Disabled rules are kept but skipped.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One delivery channel, as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum ChannelSettings {
    /// Structured-log delivery.
    Log,
    /// HTTP POST delivery.
    Webhook {
        /// The endpoint to POST alert envelopes to.
        url: String,
    },
}

/// Threshold knobs consumed by the default rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdSettings {
    /// Tolerated error fraction, in [0, 1].
    #[serde(default = "default_error_rate")]
    pub error_rate: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            error_rate: default_error_rate(),
        }
    }
}

/// Sampling knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceSettings {
    /// Fraction of observations recorded, in [0, 1].
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
        }
    }
}

/// Admin HTTP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminSettings {
    /// Whether the HTTP surface is served.
    #[serde(default)]
    pub enabled: bool,
    /// The address to bind the HTTP server to (e.g. "127.0.0.1:9600").
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_bind_address(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_flush_interval() -> Duration {
    Duration::from_secs(60)
}

const fn default_max_series() -> usize {
    10_000
}

fn default_histogram_buckets() -> Vec<f64> {
    vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
}

const fn default_check_interval() -> Duration {
    Duration::from_secs(30)
}

const fn default_check_timeout() -> Duration {
    Duration::from_secs(5)
}

const fn default_failure_threshold() -> u32 {
    3
}

fn default_filesystem_check() -> BuiltinCheckSettings {
    BuiltinCheckSettings {
        critical: true,
        ..BuiltinCheckSettings::default()
    }
}

const fn default_alert_cooldown() -> Duration {
    Duration::from_secs(300)
}

const fn default_evaluation_interval() -> Duration {
    Duration::from_secs(30)
}

const fn default_error_rate() -> f64 {
    0.05
}

const fn default_sample_rate() -> f64 {
    1.0
}

fn default_bind_address() -> String {
    "127.0.0.1:9600".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_full_defaults() {
        let settings: MonitoringSettings = serde_json::from_str("{}").expect("deserializes");
        assert!(settings.enabled);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.metrics.flush_interval, Duration::from_secs(60));
        assert!(settings.health.filesystem.critical);
        assert!(!settings.health.memory.critical);
        assert!(!settings.admin.enabled);
    }

    #[test]
    fn humantime_durations_parse() {
        let doc = r#"{
            "metrics": { "flush_interval": "2m" },
            "health": { "check_interval": "10s" },
            "alerting": { "cooldown": "1m 30s" }
        }"#;
        let settings: MonitoringSettings = serde_json::from_str(doc).expect("deserializes");
        assert_eq!(settings.metrics.flush_interval, Duration::from_secs(120));
        assert_eq!(settings.health.check_interval, Duration::from_secs(10));
        assert_eq!(settings.alerting.cooldown, Duration::from_secs(90));
    }

    #[test]
    fn channels_are_tagged_by_kind() {
        let doc = r#"{
            "alerting": {
                "channels": [
                    { "kind": "log" },
                    { "kind": "webhook", "url": "http://127.0.0.1:1/hook" }
                ]
            }
        }"#;
        let settings: MonitoringSettings = serde_json::from_str(doc).expect("deserializes");
        assert_eq!(settings.alerting.channels.len(), 2);
        assert!(matches!(
            settings.alerting.channels[1],
            ChannelSettings::Webhook { .. }
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let doc = r#"{ "metrics": { "surprise": true } }"#;
        assert!(serde_json::from_str::<MonitoringSettings>(doc).is_err());
    }
}
