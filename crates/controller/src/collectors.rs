// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Pull collectors bridging the other engines into the metric store.
//!
//! These run at gather time, so the series the default alert rules watch
//! (`tasks_alive`, `memory_resident_bytes`, `health_critical_unhealthy`) are
//! present in every snapshot without any push-side wiring.

use chrono::Utc;
use std::sync::Arc;
use vitals_debounce::DebounceStats;
use vitals_health::{HealthRunner, HealthStatus};
use vitals_telemetry::{Collector, LabelSet, MetricKind, Sample};

/// Emits runtime gauges: live task count and resident memory.
#[derive(Debug, Default)]
pub struct RuntimeCollector;

impl Collector for RuntimeCollector {
    fn name(&self) -> &str {
        "runtime"
    }

    fn collect(&self) -> Vec<Sample> {
        let now = Utc::now();
        let mut samples = Vec::with_capacity(2);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            samples.push(Sample::new(
                "tasks_alive",
                MetricKind::Gauge,
                handle.metrics().num_alive_tasks() as f64,
                LabelSet::empty(),
                now,
            ));
        }
        if let Some(stats) = memory_stats::memory_stats() {
            samples.push(Sample::new(
                "memory_resident_bytes",
                MetricKind::Gauge,
                stats.physical_mem as f64,
                LabelSet::empty(),
                now,
            ));
        }
        samples
    }
}

/// Emits gauges summarizing the latest health run.
#[derive(Debug)]
pub struct HealthCollector {
    runner: Arc<HealthRunner>,
}

impl HealthCollector {
    /// Creates a collector over the given runner.
    #[must_use]
    pub fn new(runner: Arc<HealthRunner>) -> Self {
        Self { runner }
    }
}

impl Collector for HealthCollector {
    fn name(&self) -> &str {
        "health"
    }

    fn collect(&self) -> Vec<Sample> {
        let now = Utc::now();
        let results = self.runner.snapshot();
        let critical_unhealthy = results
            .values()
            .filter(|r| r.critical && r.status == HealthStatus::Unhealthy)
            .count();
        let unhealthy = results
            .values()
            .filter(|r| r.status == HealthStatus::Unhealthy)
            .count();

        vec![
            Sample::new(
                "health_critical_unhealthy",
                MetricKind::Gauge,
                critical_unhealthy as f64,
                LabelSet::empty(),
                now,
            ),
            Sample::new(
                "health_checks_unhealthy",
                MetricKind::Gauge,
                unhealthy as f64,
                LabelSet::empty(),
                now,
            ),
        ]
    }
}

/// Emits the debouncer's shed-event counters.
#[derive(Debug)]
pub struct DebounceCollector {
    stats: Arc<DebounceStats>,
}

impl DebounceCollector {
    /// Creates a collector over the given debouncer counters.
    #[must_use]
    pub fn new(stats: Arc<DebounceStats>) -> Self {
        Self { stats }
    }
}

impl Collector for DebounceCollector {
    fn name(&self) -> &str {
        "debounce"
    }

    fn collect(&self) -> Vec<Sample> {
        let now = Utc::now();
        let snapshot = self.stats.snapshot();
        let counter = |name: &str, value: u64| {
            Sample::new(name, MetricKind::Counter, value as f64, LabelSet::empty(), now)
        };
        vec![
            counter("watch_events_total", snapshot.events_in),
            counter("watch_events_dropped_total", snapshot.ingress_dropped),
            counter("watch_events_evicted_total", snapshot.evicted),
            counter("watch_batches_total", snapshot.batches),
            counter("watch_batches_dropped_total", snapshot.egress_dropped),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runtime_collector_reports_tasks_and_memory() {
        let samples = RuntimeCollector.collect();
        assert!(samples.iter().any(|s| s.name == "tasks_alive"));
    }

    #[tokio::test]
    async fn health_collector_counts_critical_unhealthy() {
        use async_trait::async_trait;
        use vitals_health::{CheckOutcome, HealthCheck};

        struct Down;
        #[async_trait]
        impl HealthCheck for Down {
            fn name(&self) -> &str {
                "down"
            }
            fn critical(&self) -> bool {
                true
            }
            async fn check(&self) -> CheckOutcome {
                CheckOutcome::unhealthy("down")
            }
        }

        let runner = Arc::new(HealthRunner::default());
        runner.register(Arc::new(Down)).expect("register");
        runner
            .run_once(&tokio_util::sync::CancellationToken::new())
            .await;

        let samples = HealthCollector::new(runner).collect();
        let critical = samples
            .iter()
            .find(|s| s.name == "health_critical_unhealthy")
            .expect("critical gauge present");
        assert_eq!(critical.value, 1.0);
    }
}
