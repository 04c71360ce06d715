// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Rule evaluation and the per-rule instance state machine.
//!
//! State transitions happen under the instance map's write lock; channel
//! fan-out happens after the lock is released, on spawned tasks, so delivery
//! latency never blocks evaluation. Readers observe only legal sequences
//! (absent → active → absent); in-engine bookkeeping is not visible.

use crate::alert::Alert;
use crate::channel::AlertChannel;
use crate::error::Error;
use crate::rule::{AlertOp, AlertRule, Severity};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use vitals_clock::{SharedClock, system_clock};
use vitals_telemetry::{LabelSet, Sample};

/// How long a resolved instance lingers before it is removed entirely.
const RESOLVE_GRACE: Duration = Duration::from_secs(300);

/// Retained history entries.
const HISTORY_CAP: usize = 1000;

#[derive(Debug, Default)]
struct RuleState {
    alert: Option<Alert>,
    /// Monotonic time of the last resolve; gates the cooldown and the grace
    /// purge. Survives instance removal so cooldown enforcement outlives the
    /// grace period.
    last_resolved: Option<Instant>,
}

enum Transition {
    Fired(Alert),
    Resolved(Alert),
    Unchanged,
}

/// Evaluates samples against rules and fans alerts out to channels.
pub struct AlertEngine {
    rules: RwLock<HashMap<String, AlertRule>>,
    states: RwLock<HashMap<String, RuleState>>,
    history: RwLock<VecDeque<Alert>>,
    channels: RwLock<Vec<Arc<dyn AlertChannel>>>,
    latest: RwLock<HashMap<(String, LabelSet), f64>>,
    clock: SharedClock,
}

impl fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertEngine")
            .field("rules", &self.rules.read().len())
            .field("states", &self.states.read().len())
            .field("channels", &self.channels.read().len())
            .finish()
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

impl AlertEngine {
    /// Creates an engine with no rules and no channels.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            states: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            channels: RwLock::new(Vec::new()),
            latest: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Registers (or replaces) a rule.
    pub fn register_rule(&self, rule: AlertRule) -> Result<(), Error> {
        if rule.name.is_empty() {
            return Err(Error::EmptyRuleName);
        }
        let _ = self.rules.write().insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Removes a rule and its instance state.
    pub fn remove_rule(&self, name: &str) {
        let _ = self.rules.write().remove(name);
        let _ = self.states.write().remove(name);
    }

    /// The registered rules.
    #[must_use]
    pub fn rules(&self) -> Vec<AlertRule> {
        let mut rules: Vec<_> = self.rules.read().values().cloned().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    /// Adds a delivery channel.
    pub fn add_channel(&self, channel: Arc<dyn AlertChannel>) {
        self.channels.write().push(channel);
    }

    /// Evaluates one batch of samples against every enabled rule.
    pub fn evaluate(&self, samples: &[Sample]) {
        let rules: Vec<AlertRule> = self
            .rules
            .read()
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect();

        // Refresh the latest-value cache for the metrics the rules watch.
        {
            let watched: HashSet<&str> = rules.iter().map(|r| r.metric.as_str()).collect();
            let mut latest = self.latest.write();
            for sample in samples {
                if watched.contains(sample.name.as_str()) {
                    let _ = latest.insert((sample.name.clone(), sample.labels.clone()), sample.value);
                }
            }
        }

        let now_mono = self.clock.now();
        let now_wall = self.clock.wall_now();
        for rule in &rules {
            let observed = self.observed_value(rule);
            let (firing, value) = match (observed, rule.op) {
                (None, AlertOp::Exists) => (true, 0.0),
                (None, _) => (false, 0.0),
                (Some(v), AlertOp::Exists) => (false, v),
                (Some(v), op) => (op.compare(v, rule.threshold), v),
            };
            self.transition(rule, firing, value, now_mono, now_wall);
        }
        self.purge_resolved(now_mono);
    }

    /// Currently firing instances, sorted by rule name.
    #[must_use]
    pub fn active_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .states
            .read()
            .values()
            .filter_map(|s| s.alert.clone())
            .filter(|a| a.active)
            .collect();
        alerts.sort_by(|a, b| a.rule.cmp(&b.rule));
        alerts
    }

    /// Every retained instance, firing or within its resolve grace period.
    #[must_use]
    pub fn instances(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .states
            .read()
            .values()
            .filter_map(|s| s.alert.clone())
            .collect();
        alerts.sort_by(|a, b| a.rule.cmp(&b.rule));
        alerts
    }

    /// Alert instances first seen within the last `hours` hours.
    #[must_use]
    pub fn history(&self, hours: u64) -> Vec<Alert> {
        let cutoff = self.clock.wall_now() - chrono::Duration::hours(hours as i64);
        self.history
            .read()
            .iter()
            .filter(|a| a.first_seen >= cutoff)
            .cloned()
            .collect()
    }

    /// Picks the value for a rule from the latest-value cache.
    ///
    /// An unlabeled rule matches only the unlabeled series of its metric. A
    /// labeled rule matches any series whose labels are a superset; when
    /// several series match, the one with the smallest label set (ties broken
    /// by label order) is used, so evaluation is deterministic.
    fn observed_value(&self, rule: &AlertRule) -> Option<f64> {
        let latest = self.latest.read();
        if rule.labels.is_empty() {
            return latest
                .get(&(rule.metric.clone(), LabelSet::empty()))
                .copied();
        }
        let mut candidates: Vec<(&LabelSet, f64)> = latest
            .iter()
            .filter(|((name, labels), _)| name == &rule.metric && rule.labels.is_subset_of(labels))
            .map(|((_, labels), value)| (labels, *value))
            .collect();
        candidates.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(b.0)));
        candidates.first().map(|(_, value)| *value)
    }

    fn transition(
        &self,
        rule: &AlertRule,
        firing: bool,
        value: f64,
        now_mono: Instant,
        now_wall: DateTime<Utc>,
    ) {
        let outcome = {
            let mut states = self.states.write();
            let state = states.entry(rule.name.clone()).or_default();
            match state.alert.as_mut() {
                Some(alert) if alert.active => {
                    if firing {
                        alert.count += 1;
                        alert.last_seen = now_wall;
                        alert.value = value;
                        Transition::Unchanged
                    } else {
                        alert.active = false;
                        alert.last_seen = now_wall;
                        state.last_resolved = Some(now_mono);
                        let mut resolved = alert.clone();
                        resolved.message = format!("RESOLVED: {}", rule.message);
                        Transition::Resolved(resolved)
                    }
                }
                _ => {
                    let in_cooldown = state
                        .last_resolved
                        .is_some_and(|last| now_mono.duration_since(last) < rule.cooldown);
                    if firing && !in_cooldown {
                        let alert = Alert {
                            rule: rule.name.clone(),
                            severity: rule.severity,
                            message: rule.message.clone(),
                            value,
                            threshold: rule.threshold,
                            first_seen: now_wall,
                            last_seen: now_wall,
                            count: 1,
                            active: true,
                        };
                        state.alert = Some(alert.clone());
                        Transition::Fired(alert)
                    } else {
                        Transition::Unchanged
                    }
                }
            }
        };

        match outcome {
            Transition::Fired(alert) => {
                self.log_fired(&alert);
                {
                    let mut history = self.history.write();
                    if history.len() >= HISTORY_CAP {
                        let _ = history.pop_front();
                    }
                    history.push_back(alert.clone());
                }
                self.dispatch(alert);
            }
            Transition::Resolved(alert) => {
                tracing::info!(rule = %alert.rule, "alert resolved");
                {
                    // Keep the history entry in step with the instance.
                    let mut history = self.history.write();
                    if let Some(entry) = history
                        .iter_mut()
                        .rev()
                        .find(|a| a.rule == alert.rule && a.first_seen == alert.first_seen)
                    {
                        entry.active = false;
                        entry.last_seen = alert.last_seen;
                        entry.count = alert.count;
                    }
                }
                self.dispatch(alert);
            }
            Transition::Unchanged => {}
        }
    }

    fn log_fired(&self, alert: &Alert) {
        match alert.severity {
            Severity::Info => {
                tracing::info!(rule = %alert.rule, value = alert.value, "alert fired");
            }
            Severity::Warning => {
                tracing::warn!(rule = %alert.rule, value = alert.value, "alert fired");
            }
            Severity::Critical => {
                tracing::error!(rule = %alert.rule, value = alert.value, "alert fired");
            }
        }
    }

    /// Drops instances that resolved more than the grace period ago. The
    /// per-rule resolve timestamp is retained for cooldown enforcement.
    fn purge_resolved(&self, now: Instant) {
        let mut states = self.states.write();
        for state in states.values_mut() {
            let expired = state.alert.as_ref().is_some_and(|a| !a.active)
                && state
                    .last_resolved
                    .is_some_and(|at| now.duration_since(at) >= RESOLVE_GRACE);
            if expired {
                state.alert = None;
            }
        }
    }

    /// Fans an alert out to every channel concurrently, without waiting for
    /// acknowledgement. Send failures are logged and do not affect state.
    fn dispatch(&self, alert: Alert) {
        let channels: Vec<Arc<dyn AlertChannel>> = self.channels.read().clone();
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(rule = %alert.rule, "no runtime available for alert fan-out");
            return;
        };
        for channel in channels {
            let alert = alert.clone();
            let _ = handle.spawn(async move {
                if let Err(e) = channel.send(&alert).await {
                    tracing::error!(
                        error = %e,
                        channel = channel.name(),
                        rule = %alert.rule,
                        "alert delivery failed"
                    );
                }
            });
        }
    }
}
