// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Concurrent check execution.
//!
//! A run launches every registered check in parallel, each inside its own
//! [`BoundedScope`], collects the results into a fresh map, and swaps the map
//! in under a single write lock. Readers therefore see exactly one completed
//! run at a time.

use crate::aggregate::{HealthSummary, aggregate};
use crate::check::{CheckOutcome, HealthCheck, HealthResult, HealthStatus};
use crate::error::Error;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use vitals_clock::{BoundedScope, SharedClock, Ticker, system_clock};

/// Runs registered health checks and holds the latest result set.
pub struct HealthRunner {
    checks: RwLock<HashMap<String, Arc<dyn HealthCheck>>>,
    results: RwLock<HashMap<String, HealthResult>>,
    clock: SharedClock,
}

impl fmt::Debug for HealthRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthRunner")
            .field("checks", &self.checks.read().len())
            .field("results", &self.results.read().len())
            .finish()
    }
}

impl Default for HealthRunner {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

impl HealthRunner {
    /// Creates an empty runner.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            checks: RwLock::new(HashMap::new()),
            results: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Registers a check.
    ///
    /// Re-registering a name replaces the check and discards its prior
    /// result.
    pub fn register(&self, check: Arc<dyn HealthCheck>) -> Result<(), Error> {
        let name = check.name().to_string();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let _ = self.checks.write().insert(name.clone(), check);
        let _ = self.results.write().remove(&name);
        Ok(())
    }

    /// Removes a check and its result.
    pub fn deregister(&self, name: &str) {
        let _ = self.checks.write().remove(name);
        let _ = self.results.write().remove(name);
    }

    /// Names of the registered checks.
    #[must_use]
    pub fn check_names(&self) -> Vec<String> {
        self.checks.read().keys().cloned().collect()
    }

    /// Runs every registered check once, in parallel, and atomically replaces
    /// the result set.
    pub async fn run_once(&self, cancel: &CancellationToken) {
        let checks: Vec<Arc<dyn HealthCheck>> = self.checks.read().values().cloned().collect();

        let mut tasks = JoinSet::new();
        for check in checks {
            let scope = BoundedScope::new(cancel, check.timeout());
            let clock = self.clock.clone();
            let _ = tasks.spawn(async move {
                let name = check.name().to_string();
                let result = run_check(&*check, &scope, &clock).await;
                (name, result)
            });
        }

        let mut fresh = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    let _ = fresh.insert(name, result);
                }
                Err(e) => tracing::error!(error = %e, "health check task failed"),
            }
        }
        *self.results.write() = fresh;
    }

    /// Re-runs a single registered check right now and refreshes its stored
    /// result. Returns the fresh status, or `None` for an unknown name.
    pub async fn probe(&self, name: &str) -> Option<HealthStatus> {
        let check = self.checks.read().get(name).cloned()?;
        let scope = BoundedScope::detached(check.timeout());
        let result = run_check(&*check, &scope, &self.clock).await;
        let status = result.status;
        let _ = self.results.write().insert(name.to_string(), result);
        Some(status)
    }

    /// A copy of the latest completed result set.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, HealthResult> {
        self.results.read().clone()
    }

    /// The latest result for one check.
    #[must_use]
    pub fn result(&self, name: &str) -> Option<HealthResult> {
        self.results.read().get(name).cloned()
    }

    /// Rolls the latest result set up into an overall status plus counts.
    #[must_use]
    pub fn aggregate(&self) -> (HealthStatus, HealthSummary) {
        aggregate(&self.results.read())
    }

    /// Spawns the periodic background runner.
    ///
    /// Callers wanting a non-empty result set immediately after start should
    /// invoke [`HealthRunner::run_once`] first; the background task only
    /// fires after the first full interval.
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let runner = self;
        tokio::spawn(async move {
            let mut ticker = Ticker::new(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => runner.run_once(&cancel).await,
                }
            }
        })
    }
}

async fn run_check(
    check: &dyn HealthCheck,
    scope: &BoundedScope,
    clock: &SharedClock,
) -> HealthResult {
    let started = clock.now();
    let outcome = match scope.run(check.check()).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_timeout() => CheckOutcome::unhealthy(format!(
            "health check timed out after {:?}",
            check.timeout()
        )),
        Err(_) => CheckOutcome::with_status(HealthStatus::Unknown, "health check cancelled"),
    };
    HealthResult {
        status: outcome.status,
        message: outcome.message,
        duration: clock.now() - started,
        last_checked: clock.wall_now(),
        metadata: outcome.metadata,
        critical: check.critical(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StaticCheck {
        name: &'static str,
        status: HealthStatus,
        critical: bool,
    }

    #[async_trait]
    impl HealthCheck for StaticCheck {
        fn name(&self) -> &str {
            self.name
        }
        fn critical(&self) -> bool {
            self.critical
        }
        async fn check(&self) -> CheckOutcome {
            CheckOutcome::with_status(self.status, "static")
        }
    }

    struct SlowCheck;

    #[async_trait]
    impl HealthCheck for SlowCheck {
        fn name(&self) -> &str {
            "slow"
        }
        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
        async fn check(&self) -> CheckOutcome {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            CheckOutcome::healthy("never reached")
        }
    }

    fn runner() -> Arc<HealthRunner> {
        Arc::new(HealthRunner::default())
    }

    #[tokio::test(start_paused = true)]
    async fn run_produces_one_result_per_check() {
        let runner = runner();
        runner
            .register(Arc::new(StaticCheck {
                name: "db",
                status: HealthStatus::Healthy,
                critical: true,
            }))
            .expect("register");
        runner
            .register(Arc::new(StaticCheck {
                name: "cache",
                status: HealthStatus::Degraded,
                critical: false,
            }))
            .expect("register");

        runner.run_once(&CancellationToken::new()).await;
        let snapshot = runner.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["db"].status, HealthStatus::Healthy);
        assert!(snapshot["db"].critical);
        assert_eq!(snapshot["cache"].status, HealthStatus::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_unhealthy_with_timeout_message() {
        let runner = runner();
        runner.register(Arc::new(SlowCheck)).expect("register");

        runner.run_once(&CancellationToken::new()).await;
        let result = runner.result("slow").expect("result recorded");
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(result.message.contains("timed out"));
        assert!(result.duration >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn reregistering_discards_the_prior_result() {
        let runner = runner();
        runner
            .register(Arc::new(StaticCheck {
                name: "db",
                status: HealthStatus::Unhealthy,
                critical: false,
            }))
            .expect("register");
        runner.run_once(&CancellationToken::new()).await;
        assert!(runner.result("db").is_some());

        runner
            .register(Arc::new(StaticCheck {
                name: "db",
                status: HealthStatus::Healthy,
                critical: false,
            }))
            .expect("register");
        assert!(runner.result("db").is_none(), "prior result discarded");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_names_are_rejected() {
        let runner = runner();
        let err = runner
            .register(Arc::new(StaticCheck {
                name: "",
                status: HealthStatus::Healthy,
                critical: false,
            }))
            .expect_err("empty name must be rejected");
        assert!(matches!(err, Error::EmptyName));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_refreshes_a_single_entry() {
        struct Toggle {
            healthy: AtomicBool,
        }

        #[async_trait]
        impl HealthCheck for Toggle {
            fn name(&self) -> &str {
                "toggle"
            }
            async fn check(&self) -> CheckOutcome {
                if self.healthy.load(Ordering::Relaxed) {
                    CheckOutcome::healthy("up")
                } else {
                    CheckOutcome::unhealthy("down")
                }
            }
        }

        let toggle = Arc::new(Toggle {
            healthy: AtomicBool::new(false),
        });
        let runner = runner();
        runner.register(toggle.clone()).expect("register");
        runner.run_once(&CancellationToken::new()).await;
        assert_eq!(
            runner.result("toggle").map(|r| r.status),
            Some(HealthStatus::Unhealthy)
        );

        toggle.healthy.store(true, Ordering::Relaxed);
        assert_eq!(runner.probe("toggle").await, Some(HealthStatus::Healthy));
        assert_eq!(
            runner.result("toggle").map(|r| r.status),
            Some(HealthStatus::Healthy)
        );
        assert_eq!(runner.probe("missing").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_runner_refreshes_results() {
        let runner = runner();
        runner
            .register(Arc::new(StaticCheck {
                name: "db",
                status: HealthStatus::Healthy,
                critical: false,
            }))
            .expect("register");

        let cancel = CancellationToken::new();
        let handle = runner.clone().spawn_periodic(Duration::from_secs(30), cancel.clone());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(runner.result("db").is_some());

        cancel.cancel();
        handle.await.expect("periodic task joins");
    }
}
