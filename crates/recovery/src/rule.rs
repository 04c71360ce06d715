// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Recovery rules.

use crate::action::RecoveryAction;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Binds a health check to an ordered recovery action sequence.
#[derive(Clone)]
pub struct RecoveryRule {
    /// The health check this rule watches.
    pub check: String,
    /// Consecutive failures required before the first attempt.
    pub min_failures: u32,
    /// Deadline for one whole attempt (all actions plus verification).
    pub attempt_timeout: Duration,
    /// Minimum time between two attempts.
    pub cooldown: Duration,
    /// Attempts allowed per continuous failure streak.
    pub max_attempts: u32,
    /// Actions to run, in order.
    pub actions: Vec<Arc<dyn RecoveryAction>>,
}

impl fmt::Debug for RecoveryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryRule")
            .field("check", &self.check)
            .field("min_failures", &self.min_failures)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("cooldown", &self.cooldown)
            .field("max_attempts", &self.max_attempts)
            .field(
                "actions",
                &self.actions.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RecoveryRule {
    /// Creates a rule with conservative defaults: 3 consecutive failures,
    /// 30-second attempt deadline, 60-second cooldown, 3 attempts.
    #[must_use]
    pub fn new(check: impl Into<String>, actions: Vec<Arc<dyn RecoveryAction>>) -> Self {
        Self {
            check: check.into(),
            min_failures: 3,
            attempt_timeout: Duration::from_secs(30),
            cooldown: Duration::from_secs(60),
            max_attempts: 3,
            actions,
        }
    }

    /// Builder-style failure threshold.
    #[must_use]
    pub fn min_failures(mut self, min_failures: u32) -> Self {
        self.min_failures = min_failures;
        self
    }

    /// Builder-style attempt deadline.
    #[must_use]
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Builder-style cooldown.
    #[must_use]
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Builder-style attempt cap.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}
