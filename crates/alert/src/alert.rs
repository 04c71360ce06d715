// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Alert instances.

use crate::rule::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A live (or recently resolved) alert.
///
/// The rule name is the alert identity: at most one instance per rule exists
/// at any time, and a renamed rule is a different alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// The originating rule name.
    pub rule: String,
    /// Severity inherited from the rule.
    pub severity: Severity,
    /// The rule's message; resolved fan-outs carry a "RESOLVED: " prefix.
    pub message: String,
    /// The observed value at the last evaluation.
    pub value: f64,
    /// The rule threshold at fire time.
    pub threshold: f64,
    /// When the instance was created.
    pub first_seen: DateTime<Utc>,
    /// When the instance last fired or resolved.
    pub last_seen: DateTime<Utc>,
    /// Consecutive evaluations in which the condition held.
    pub count: u64,
    /// Whether the instance is currently firing.
    pub active: bool,
}
