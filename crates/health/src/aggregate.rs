// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Aggregate status rollup.

use crate::check::{HealthResult, HealthStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-status counts over one result set.
///
/// `critical` counts checks whose critical flag is set, regardless of their
/// status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Total checks in the result set.
    pub total: usize,
    /// Checks reporting healthy.
    pub healthy: usize,
    /// Checks reporting unhealthy.
    pub unhealthy: usize,
    /// Checks reporting degraded.
    pub degraded: usize,
    /// Checks reporting unknown.
    pub unknown: usize,
    /// Checks flagged critical.
    pub critical: usize,
}

/// Rolls one result set up into an overall status plus counts.
///
/// Policy, applied in order: any critical check unhealthy → unhealthy; any
/// check degraded → degraded; any non-critical check unhealthy → degraded;
/// otherwise healthy.
#[must_use]
pub fn aggregate(results: &HashMap<String, HealthResult>) -> (HealthStatus, HealthSummary) {
    let mut summary = HealthSummary {
        total: results.len(),
        ..HealthSummary::default()
    };
    let mut critical_unhealthy = false;
    let mut any_degraded = false;
    let mut any_unhealthy = false;

    for result in results.values() {
        match result.status {
            HealthStatus::Healthy => summary.healthy += 1,
            HealthStatus::Degraded => {
                summary.degraded += 1;
                any_degraded = true;
            }
            HealthStatus::Unhealthy => {
                summary.unhealthy += 1;
                any_unhealthy = true;
                if result.critical {
                    critical_unhealthy = true;
                }
            }
            HealthStatus::Unknown => summary.unknown += 1,
        }
        if result.critical {
            summary.critical += 1;
        }
    }

    let overall = if critical_unhealthy {
        HealthStatus::Unhealthy
    } else if any_degraded || any_unhealthy {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };
    (overall, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn result(status: HealthStatus, critical: bool) -> HealthResult {
        HealthResult {
            status,
            message: String::new(),
            duration: Duration::from_millis(1),
            last_checked: Utc::now(),
            metadata: Default::default(),
            critical,
        }
    }

    fn results(entries: &[(&str, HealthStatus, bool)]) -> HashMap<String, HealthResult> {
        entries
            .iter()
            .map(|(name, status, critical)| (name.to_string(), result(*status, *critical)))
            .collect()
    }

    #[test]
    fn critical_unhealthy_forces_overall_unhealthy() {
        let set = results(&[
            ("c1", HealthStatus::Healthy, false),
            ("c2", HealthStatus::Unhealthy, true),
            ("c3", HealthStatus::Degraded, false),
        ]);
        let (overall, summary) = aggregate(&set);
        assert_eq!(overall, HealthStatus::Unhealthy);
        assert_eq!(
            summary,
            HealthSummary {
                total: 3,
                healthy: 1,
                unhealthy: 1,
                degraded: 1,
                unknown: 0,
                critical: 1,
            }
        );
    }

    #[test]
    fn rollup_truth_table() {
        use HealthStatus::{Degraded, Healthy, Unhealthy, Unknown};
        let statuses = [Healthy, Degraded, Unhealthy, Unknown];

        // Exhaustive over two checks × critical flags: the rollup must match
        // the four ordered rules.
        for a in statuses {
            for b in statuses {
                for a_crit in [false, true] {
                    for b_crit in [false, true] {
                        let set = results(&[("a", a, a_crit), ("b", b, b_crit)]);
                        let (overall, _) = aggregate(&set);

                        let crit_unhealthy =
                            (a == Unhealthy && a_crit) || (b == Unhealthy && b_crit);
                        let any_degraded = a == Degraded || b == Degraded;
                        let any_unhealthy = a == Unhealthy || b == Unhealthy;

                        let expected = if crit_unhealthy {
                            Unhealthy
                        } else if any_degraded || any_unhealthy {
                            Degraded
                        } else {
                            Healthy
                        };
                        assert_eq!(overall, expected, "a={a:?}/{a_crit} b={b:?}/{b_crit}");
                    }
                }
            }
        }
    }

    #[test]
    fn empty_result_set_is_healthy() {
        let (overall, summary) = aggregate(&HashMap::new());
        assert_eq!(overall, HealthStatus::Healthy);
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn critical_counts_by_flag_not_status() {
        let set = results(&[
            ("a", HealthStatus::Healthy, true),
            ("b", HealthStatus::Degraded, true),
        ]);
        let (_, summary) = aggregate(&set);
        assert_eq!(summary.critical, 2);
    }
}
