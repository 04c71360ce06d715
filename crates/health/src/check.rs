// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! The health check capability and its result types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default per-check timeout when a check does not override it.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// The status a check (or the aggregate) can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Operating normally.
    Healthy,
    /// Operational but impaired.
    Degraded,
    /// Not operational.
    Unhealthy,
    /// No reading available.
    Unknown,
}

/// What a check reports, before the runner attaches timing.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// The observed status.
    pub status: HealthStatus,
    /// Human-readable explanation.
    pub message: String,
    /// Optional structured context.
    pub metadata: BTreeMap<String, String>,
}

impl CheckOutcome {
    /// A healthy outcome with the given message.
    #[must_use]
    pub fn healthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Healthy, message)
    }

    /// A degraded outcome with the given message.
    #[must_use]
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Degraded, message)
    }

    /// An unhealthy outcome with the given message.
    #[must_use]
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Unhealthy, message)
    }

    /// An outcome with an explicit status.
    #[must_use]
    pub fn with_status(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches one metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A completed check reading as stored by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResult {
    /// The observed status.
    pub status: HealthStatus,
    /// Human-readable explanation.
    pub message: String,
    /// How long the check took (or its timeout, when it expired).
    #[serde(with = "duration_seconds")]
    pub duration: Duration,
    /// When the check last completed.
    pub last_checked: DateTime<Utc>,
    /// Optional structured context.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Whether an unhealthy reading forces the aggregate unhealthy.
    pub critical: bool,
}

mod duration_seconds {
    //! Serialize durations as fractional seconds.
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// A named, individually time-bounded unit of health probing.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// The check's registry name.
    fn name(&self) -> &str;

    /// Whether an unhealthy reading forces the aggregate unhealthy.
    fn critical(&self) -> bool {
        false
    }

    /// The check's own deadline; expiry yields an unhealthy result.
    fn timeout(&self) -> Duration {
        DEFAULT_CHECK_TIMEOUT
    }

    /// Probes the resource.
    async fn check(&self) -> CheckOutcome;
}
