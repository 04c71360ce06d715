// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-check recovery bookkeeping.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the engine remembers about one check's failures and attempts.
///
/// Snapshots handed to callers are deep copies; mutating one never touches
/// engine state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryHistory {
    /// Consecutive supervision ticks in which the check was unhealthy.
    pub consecutive_failures: u32,
    /// When the check was last seen unhealthy.
    pub last_failure: Option<DateTime<Utc>>,
    /// When the last recovery attempt started.
    pub last_recovery: Option<DateTime<Utc>>,
    /// Attempts made during the current failure streak.
    pub attempts: u32,
    /// Whether the most recent attempt restored health.
    pub last_successful: bool,
    /// The most recent attempt's error, if it failed.
    pub last_error: Option<String>,
}
