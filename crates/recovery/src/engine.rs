// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! The recovery supervisor.
//!
//! Each supervision tick reads the health runner's latest results. A healthy
//! check with prior failures has its streak reset; an unhealthy check
//! accumulates failures and, once eligible (enough failures, attempts under
//! the cap, cooldown elapsed), gets one deadline-bounded attempt. Attempts
//! verify against a live re-probe of the check, not the stored result.

use crate::error::Error;
use crate::history::RecoveryHistory;
use crate::rule::RecoveryRule;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use vitals_clock::{BoundedScope, SharedClock, Ticker};
use vitals_health::{HealthRunner, HealthStatus};

/// Settle time between a successful action and the verification probe.
const DEFAULT_STABILIZATION: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct CheckState {
    history: RecoveryHistory,
    /// Monotonic time of the last attempt, for cooldown arithmetic.
    last_attempt: Option<Instant>,
    /// Set once the terminal "giving up" error has been logged.
    gave_up: bool,
}

/// Supervises failing checks and runs their recovery rules.
pub struct RecoveryEngine {
    rules: RwLock<HashMap<String, RecoveryRule>>,
    states: RwLock<HashMap<String, CheckState>>,
    runner: Arc<HealthRunner>,
    clock: SharedClock,
    stabilization: Duration,
}

impl fmt::Debug for RecoveryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryEngine")
            .field("rules", &self.rules.read().len())
            .field("states", &self.states.read().len())
            .finish()
    }
}

impl RecoveryEngine {
    /// Creates an engine over the given health runner.
    #[must_use]
    pub fn new(runner: Arc<HealthRunner>, clock: SharedClock) -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            states: RwLock::new(HashMap::new()),
            runner,
            clock,
            stabilization: DEFAULT_STABILIZATION,
        }
    }

    /// Overrides the stabilization period between action and verification.
    #[must_use]
    pub fn with_stabilization(mut self, stabilization: Duration) -> Self {
        self.stabilization = stabilization;
        self
    }

    /// Registers (or replaces) the rule for a check.
    pub fn register_rule(&self, rule: RecoveryRule) -> Result<(), Error> {
        if rule.check.is_empty() {
            return Err(Error::EmptyCheckName);
        }
        if rule.actions.is_empty() {
            return Err(Error::NoActions {
                check: rule.check.clone(),
            });
        }
        let _ = self.rules.write().insert(rule.check.clone(), rule);
        Ok(())
    }

    /// Deep-copied history for one check.
    #[must_use]
    pub fn history(&self, check: &str) -> Option<RecoveryHistory> {
        self.states.read().get(check).map(|s| s.history.clone())
    }

    /// Deep-copied history for every tracked check.
    #[must_use]
    pub fn histories(&self) -> HashMap<String, RecoveryHistory> {
        self.states
            .read()
            .iter()
            .map(|(name, state)| (name.clone(), state.history.clone()))
            .collect()
    }

    /// One supervision pass over the current health results.
    pub async fn supervise_once(&self, cancel: &CancellationToken) {
        let results = self.runner.snapshot();
        let rules: Vec<RecoveryRule> = self.rules.read().values().cloned().collect();

        for rule in rules {
            let Some(result) = results.get(&rule.check) else {
                continue;
            };

            if result.status == HealthStatus::Healthy {
                self.note_healthy(&rule.check);
                continue;
            }
            if result.status != HealthStatus::Unhealthy {
                // Degraded and unknown readings do not consume the attempt
                // budget.
                continue;
            }

            if self.note_failure_and_check_eligibility(&rule) {
                self.attempt(&rule, cancel).await;
            }
        }
    }

    /// Spawns the periodic supervisor.
    pub fn spawn_supervisor(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let engine = self;
        tokio::spawn(async move {
            let mut ticker = Ticker::new(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => engine.supervise_once(&cancel).await,
                }
            }
        })
    }

    fn note_healthy(&self, check: &str) {
        let mut states = self.states.write();
        if let Some(state) = states.get_mut(check) {
            if state.history.consecutive_failures > 0 {
                state.history.consecutive_failures = 0;
                state.history.last_successful = true;
                state.gave_up = false;
                tracing::info!(check, "check healthy again; failure streak reset");
            }
        }
    }

    fn note_failure_and_check_eligibility(&self, rule: &RecoveryRule) -> bool {
        let now_mono = self.clock.now();
        let mut states = self.states.write();
        let state = states.entry(rule.check.clone()).or_default();

        if state.history.consecutive_failures == 0 {
            // A new failure streak gets a fresh attempt budget.
            state.history.attempts = 0;
            state.gave_up = false;
        }
        state.history.consecutive_failures += 1;
        state.history.last_failure = Some(self.clock.wall_now());

        let cooled = state
            .last_attempt
            .is_none_or(|at| now_mono.duration_since(at) >= rule.cooldown);
        let under_cap = state.history.attempts < rule.max_attempts;
        let eligible =
            state.history.consecutive_failures >= rule.min_failures && under_cap && cooled;

        if !under_cap && !state.gave_up {
            state.gave_up = true;
            tracing::error!(
                check = %rule.check,
                attempts = state.history.attempts,
                "recovery attempt budget exhausted; giving up"
            );
        }
        eligible
    }

    async fn attempt(&self, rule: &RecoveryRule, cancel: &CancellationToken) {
        {
            let mut states = self.states.write();
            let state = states.entry(rule.check.clone()).or_default();
            state.history.attempts += 1;
            state.last_attempt = Some(self.clock.now());
            state.history.last_recovery = Some(self.clock.wall_now());
            tracing::info!(
                check = %rule.check,
                attempt = state.history.attempts,
                max_attempts = rule.max_attempts,
                "starting recovery attempt"
            );
        }

        let scope = BoundedScope::new(cancel, rule.attempt_timeout);
        let outcome = match scope.run(self.run_actions(rule)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(details)) => Err(details),
            Err(e) => Err(e.to_string()),
        };

        let mut states = self.states.write();
        let state = states.entry(rule.check.clone()).or_default();
        match outcome {
            Ok(()) => {
                state.history.last_successful = true;
                state.history.last_error = None;
                tracing::info!(check = %rule.check, "recovery attempt restored health");
            }
            Err(details) => {
                state.history.last_successful = false;
                state.history.last_error = Some(details.clone());
                tracing::warn!(check = %rule.check, error = %details, "recovery attempt failed");
                if state.history.attempts >= rule.max_attempts && !state.gave_up {
                    state.gave_up = true;
                    tracing::error!(
                        check = %rule.check,
                        attempts = state.history.attempts,
                        "recovery attempt budget exhausted; giving up"
                    );
                }
            }
        }
    }

    /// Runs the rule's actions in order. An action error is logged and the
    /// sequence continues; after each successful action the check is
    /// re-probed once the stabilization period has passed.
    async fn run_actions(&self, rule: &RecoveryRule) -> Result<(), String> {
        for action in &rule.actions {
            tracing::debug!(
                check = %rule.check,
                action = action.name(),
                "running recovery action"
            );
            match action.execute(&rule.check).await {
                Ok(()) => {
                    tokio::time::sleep(self.stabilization).await;
                    if self.runner.probe(&rule.check).await == Some(HealthStatus::Healthy) {
                        return Ok(());
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        check = %rule.check,
                        action = action.name(),
                        error = %e,
                        "recovery action failed; continuing with the next action"
                    );
                }
            }
        }
        Err("all recovery actions ran without restoring health".to_string())
    }
}
