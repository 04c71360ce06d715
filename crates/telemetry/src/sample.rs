// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Metric samples as produced by [`crate::MetricStore::gather`].

use crate::labels::LabelSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing value.
    Counter,
    /// Last-write-wins value.
    Gauge,
    /// Cumulative bucketed distribution.
    Histogram,
}

/// An immutable point-in-time observation of one series.
///
/// Series identity is the `(name, labels)` tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// The series name.
    pub name: String,
    /// The series kind.
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// The observed value.
    pub value: f64,
    /// The series labels.
    #[serde(default)]
    pub labels: LabelSet,
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
    /// Optional unit annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Optional help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Sample {
    /// Creates a sample with no unit or help annotations.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: MetricKind,
        value: f64,
        labels: LabelSet,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            labels,
            timestamp,
            unit: None,
            help: None,
        }
    }
}
