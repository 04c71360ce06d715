// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Runtime task count check.

use crate::check::{CheckOutcome, HealthCheck, HealthStatus};
use async_trait::async_trait;
use std::time::Duration;

/// Watches the number of live asynchronous tasks on the runtime.
///
/// A runaway task count usually means a leaked loop or an unbounded spawn
/// site somewhere in the host service.
#[derive(Debug, Clone)]
pub struct TaskCheck {
    degraded_above: usize,
    unhealthy_above: usize,
    critical: bool,
    timeout: Duration,
}

impl Default for TaskCheck {
    fn default() -> Self {
        Self {
            degraded_above: 1_000,
            unhealthy_above: 10_000,
            critical: false,
            timeout: Duration::from_secs(1),
        }
    }
}

impl TaskCheck {
    /// Creates a check with custom thresholds.
    #[must_use]
    pub fn new(degraded_above: usize, unhealthy_above: usize) -> Self {
        Self {
            degraded_above,
            unhealthy_above,
            ..Self::default()
        }
    }

    /// Overrides the critical flag.
    #[must_use]
    pub fn critical_flag(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Overrides the per-check timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthCheck for TaskCheck {
    fn name(&self) -> &str {
        "tasks"
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn check(&self) -> CheckOutcome {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return CheckOutcome::with_status(
                HealthStatus::Unknown,
                "no runtime handle available",
            );
        };
        let alive = handle.metrics().num_alive_tasks();

        let outcome = if alive > self.unhealthy_above {
            CheckOutcome::unhealthy(format!(
                "{alive} live tasks exceed the {} ceiling",
                self.unhealthy_above
            ))
        } else if alive > self.degraded_above {
            CheckOutcome::degraded(format!(
                "{alive} live tasks above the {} watermark",
                self.degraded_above
            ))
        } else {
            CheckOutcome::healthy(format!("{alive} live tasks"))
        };
        outcome.meta("alive_tasks", alive.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn idle_runtime_is_healthy() {
        let outcome = TaskCheck::default().check().await;
        assert_eq!(outcome.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn zero_thresholds_flag_any_task() {
        let _keepalive = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        tokio::task::yield_now().await;
        let outcome = TaskCheck::new(0, usize::MAX).check().await;
        assert_eq!(outcome.status, HealthStatus::Degraded);
    }
}
