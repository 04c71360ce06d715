// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Memory pressure check.

use crate::check::{CheckOutcome, HealthCheck, HealthStatus};
use async_trait::async_trait;
use std::time::Duration;

/// Hard limit above which the check reports unhealthy: 1 GiB.
pub const DEFAULT_MEMORY_LIMIT: u64 = 1024 * 1024 * 1024;

/// Fraction of the limit above which the check reports degraded.
const SOFT_FRACTION: f64 = 0.8;

/// Watches resident memory against a hard limit.
#[derive(Debug, Clone)]
pub struct MemoryCheck {
    limit_bytes: u64,
    critical: bool,
    timeout: Duration,
}

impl Default for MemoryCheck {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_LIMIT)
    }
}

impl MemoryCheck {
    /// Creates a check with the given hard limit in bytes.
    #[must_use]
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit_bytes,
            critical: false,
            timeout: Duration::from_secs(2),
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
impl HealthCheck for MemoryCheck {
    fn name(&self) -> &str {
        "memory"
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn check(&self) -> CheckOutcome {
        let Some(stats) = memory_stats::memory_stats() else {
            return CheckOutcome::with_status(
                HealthStatus::Unknown,
                "memory readings unavailable on this platform",
            );
        };
        let resident = stats.physical_mem as u64;
        let soft = (self.limit_bytes as f64 * SOFT_FRACTION) as u64;

        let outcome = if resident > self.limit_bytes {
            CheckOutcome::unhealthy(format!(
                "resident memory {resident} bytes exceeds limit {} bytes",
                self.limit_bytes
            ))
        } else if resident > soft {
            CheckOutcome::degraded(format!(
                "resident memory {resident} bytes above {:.0}% of limit",
                SOFT_FRACTION * 100.0
            ))
        } else {
            CheckOutcome::healthy("memory within limits")
        };
        outcome.meta("resident_bytes", resident.to_string())
    }
}
