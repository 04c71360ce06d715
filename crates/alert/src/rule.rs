// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Alert rules and the default rule set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use vitals_telemetry::LabelSet;

/// Comparison applied between the observed value and the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertOp {
    /// Observed > threshold.
    Gt,
    /// Observed ≥ threshold.
    Gte,
    /// Observed < threshold.
    Lt,
    /// Observed ≤ threshold.
    Lte,
    /// Observed = threshold.
    Eq,
    /// Observed ≠ threshold.
    Ne,
    /// Fires when no sample matches the rule at all.
    Exists,
}

impl AlertOp {
    /// Applies the comparison. [`AlertOp::Exists`] never fires here; absence
    /// is decided by the engine before any value comparison.
    #[must_use]
    pub fn compare(&self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => observed > threshold,
            Self::Gte => observed >= threshold,
            Self::Lt => observed < threshold,
            Self::Lte => observed <= threshold,
            Self::Eq => observed == threshold,
            Self::Ne => observed != threshold,
            Self::Exists => false,
        }
    }
}

/// Alert severity; maps to structured log levels in the log channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Needs immediate attention.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A declarative alert rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Rule name; doubles as the alert identity.
    pub name: String,
    /// Target metric name.
    pub metric: String,
    /// Label matcher: the rule's labels must be a subset of the series
    /// labels. An empty matcher matches only the unlabeled series.
    #[serde(default)]
    pub labels: LabelSet,
    /// Comparison operator.
    pub op: AlertOp,
    /// Threshold the observed value is compared against.
    #[serde(default)]
    pub threshold: f64,
    /// Severity of alerts raised by this rule.
    pub severity: Severity,
    /// Message carried by alerts raised by this rule.
    pub message: String,
    /// Minimum time between a resolve and the next fire.
    #[serde(with = "humantime_serde", default = "default_cooldown")]
    pub cooldown: Duration,
    /// Disabled rules are skipped entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Free-form annotations forwarded with the alert.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

const fn default_enabled() -> bool {
    true
}

const fn default_cooldown() -> Duration {
    Duration::from_secs(300)
}

impl AlertRule {
    /// Creates an enabled rule with the default cooldown and no labels.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        metric: impl Into<String>,
        op: AlertOp,
        threshold: f64,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            metric: metric.into(),
            labels: LabelSet::empty(),
            op,
            threshold,
            severity,
            message: message.into(),
            cooldown: default_cooldown(),
            enabled: true,
            annotations: BTreeMap::new(),
        }
    }

    /// Builder-style label matcher.
    #[must_use]
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    /// Builder-style cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// The rules the system ships with, tuned for a component-build service.
#[must_use]
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            "high_error_rate",
            "errors_total",
            AlertOp::Gt,
            10.0,
            Severity::Warning,
            "error count exceeded 10 in the last five minutes",
        ),
        AlertRule::new(
            "heap_usage_high",
            "memory_resident_bytes",
            AlertOp::Gt,
            (1u64 << 30) as f64,
            Severity::Warning,
            "resident memory exceeded 1 GiB",
        ),
        AlertRule::new(
            "task_count_high",
            "tasks_alive",
            AlertOp::Gt,
            1000.0,
            Severity::Critical,
            "more than 1000 live tasks",
        ),
        AlertRule::new(
            "build_failures",
            "build_failures_total",
            AlertOp::Gt,
            5.0,
            Severity::Warning,
            "more than 5 build failures",
        ),
        AlertRule::new(
            "critical_check_unhealthy",
            "health_critical_unhealthy",
            AlertOp::Gte,
            1.0,
            Severity::Critical,
            "a critical health check is unhealthy",
        ),
    ]
}
