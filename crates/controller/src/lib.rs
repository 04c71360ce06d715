// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle supervisor for the observability core.
//!
//! A [`Monitor`] is constructed once from validated settings and passed
//! explicitly to the callers that need it (capability injection); a guarded
//! module-level accessor is available in [`global`] for convenience.
//!
//! Start ordering: metric store → health runner (with built-in and custom
//! checks registered, plus one synchronous initial run) → alert engine →
//! recovery engine → debouncer. Stop is the reverse, with the final metrics
//! flush happening between the store's stop signal and its task join. Stop
//! is idempotent, and every background task is joined before it returns.

pub mod collectors;
pub mod error;
pub mod global;

pub use error::Error;

use crate::collectors::{DebounceCollector, HealthCollector, RuntimeCollector};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vitals_alert::{AlertEngine, AlertOp, AlertRule, LogChannel, Severity, WebhookChannel, default_rules};
use vitals_clock::{Ticker, system_clock};
use vitals_config::{AlertRuleSettings, ChannelSettings, MonitoringSettings};
use vitals_debounce::{ChangeEvent, DebounceConfig, Debouncer, DebouncerHandle, PathWatcher};
use vitals_health::checks::{FilesystemCheck, MemoryCheck, TaskCheck};
use vitals_health::{HealthCheck, HealthRunner};
use vitals_recovery::{RecoveryAction, RecoveryEngine, RecoveryRule};
use vitals_telemetry::flusher::spawn_flusher;
use vitals_telemetry::{LabelSet, MetricStore, StoreOptions};

/// The stream of deduplicated change batches handed to the egress consumer.
pub type ChangeBatches = mpsc::Receiver<Vec<ChangeEvent>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Started,
    Stopped,
}

/// Background tasks and handles that exist only while started.
struct Running {
    debouncer: Debouncer,
    watcher: Option<PathWatcher>,
    recovery_cancel: CancellationToken,
    recovery_task: JoinHandle<()>,
    alert_cancel: CancellationToken,
    alert_task: Option<JoinHandle<()>>,
    health_cancel: CancellationToken,
    health_task: Option<JoinHandle<()>>,
    flusher_cancel: CancellationToken,
    flusher_task: Option<JoinHandle<()>>,
}

struct MonitorInner {
    settings: MonitoringSettings,
    store: MetricStore,
    runner: Arc<HealthRunner>,
    alerts: Arc<AlertEngine>,
    recovery: Arc<RecoveryEngine>,
    phase: Mutex<Phase>,
    running: Mutex<Option<Running>>,
}

/// The observability core's value-type handle.
///
/// Cheap to clone; all clones share the same engines.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("phase", &*self.inner.phase.lock())
            .field("enabled", &self.inner.settings.enabled)
            .finish()
    }
}

impl Monitor {
    /// Validates `settings` and builds the engines, without starting any
    /// background work.
    pub fn new(settings: MonitoringSettings) -> Result<Self, Error> {
        vitals_config::validate(&settings)?;

        let clock = system_clock();
        let store = MetricStore::new(StoreOptions {
            enabled: settings.enabled && settings.metrics.enabled,
            prefix: settings.metrics.prefix.clone(),
            max_series: settings.metrics.max_series,
            output_path: settings.metrics.output_path.clone(),
            buckets: settings.metrics.histogram_buckets.clone(),
            clock: clock.clone(),
        })?;
        let runner = Arc::new(HealthRunner::new(clock.clone()));
        let alerts = Arc::new(AlertEngine::new(clock.clone()));
        let recovery = Arc::new(RecoveryEngine::new(runner.clone(), clock.clone()));

        store.register_collector(Box::new(RuntimeCollector))?;
        store.register_collector(Box::new(HealthCollector::new(runner.clone())))?;

        Ok(Self {
            inner: Arc::new(MonitorInner {
                settings,
                store,
                runner,
                alerts,
                recovery,
                phase: Mutex::new(Phase::Created),
                running: Mutex::new(None),
            }),
        })
    }

    /// The metric store handle.
    #[must_use]
    pub fn metrics(&self) -> MetricStore {
        self.inner.store.clone()
    }

    /// The health runner handle.
    #[must_use]
    pub fn health(&self) -> Arc<HealthRunner> {
        self.inner.runner.clone()
    }

    /// The alert engine handle.
    #[must_use]
    pub fn alerts(&self) -> Arc<AlertEngine> {
        self.inner.alerts.clone()
    }

    /// The recovery engine handle.
    #[must_use]
    pub fn recovery(&self) -> Arc<RecoveryEngine> {
        self.inner.recovery.clone()
    }

    /// A copy of the settings the monitor was built from.
    #[must_use]
    pub fn settings(&self) -> MonitoringSettings {
        self.inner.settings.clone()
    }

    /// The configured observation sampling fraction, in [0, 1].
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.inner.settings.performance.sample_rate
    }

    /// Registers a custom health check (before or after start).
    pub fn register_check(&self, check: Arc<dyn HealthCheck>) -> Result<(), Error> {
        self.inner.runner.register(check)?;
        Ok(())
    }

    /// Builds a recovery rule pre-tuned with the configured failure
    /// threshold.
    #[must_use]
    pub fn recovery_rule(
        &self,
        check: impl Into<String>,
        actions: Vec<Arc<dyn RecoveryAction>>,
    ) -> RecoveryRule {
        RecoveryRule::new(check, actions)
            .min_failures(self.inner.settings.health.failure_threshold)
    }

    /// A clonable handle for pushing change events into the debouncer.
    ///
    /// `None` until the monitor is started.
    #[must_use]
    pub fn change_handle(&self) -> Option<DebouncerHandle> {
        self.inner.running.lock().as_ref().map(|r| r.debouncer.handle())
    }

    /// Registers a directory root with the filesystem watcher.
    pub fn watch_path(&self, root: &Path) -> Result<(), Error> {
        let mut running = self.inner.running.lock();
        let Some(running) = running.as_mut() else {
            return Err(Error::NotStarted);
        };
        if running.watcher.is_none() {
            running.watcher = Some(PathWatcher::new(running.debouncer.handle())?);
        }
        if let Some(watcher) = running.watcher.as_mut() {
            watcher.watch(root)?;
        }
        Ok(())
    }

    /// Starts every engine in order and returns the change-batch stream.
    ///
    /// Start is not reentrant: a second call (including after `stop`) returns
    /// [`Error::AlreadyStarted`].
    pub async fn start(&self) -> Result<ChangeBatches, Error> {
        {
            let mut phase = self.inner.phase.lock();
            if *phase != Phase::Created {
                return Err(Error::AlreadyStarted);
            }
            *phase = Phase::Started;
        }

        let settings = &self.inner.settings;
        if !settings.enabled {
            tracing::info!("monitoring disabled; core runs as a no-op");
            let (_tx, rx) = mpsc::channel(1);
            return Ok(rx);
        }

        // Metric store: background flusher.
        let flusher_cancel = CancellationToken::new();
        let flusher_task = (settings.metrics.enabled && settings.metrics.output_path.is_some())
            .then(|| {
                spawn_flusher(
                    self.inner.store.clone(),
                    settings.metrics.flush_interval,
                    flusher_cancel.clone(),
                )
            });

        // Health runner: built-in checks, one synchronous run, then periodic.
        let health_cancel = CancellationToken::new();
        if settings.health.enabled {
            let fs = &settings.health.filesystem;
            if fs.enabled {
                self.inner.runner.register(Arc::new(
                    FilesystemCheck::new(std::env::temp_dir())
                        .critical_flag(fs.critical)
                        .with_timeout(fs.timeout),
                ))?;
            }
            let mem = &settings.health.memory;
            if mem.enabled {
                self.inner.runner.register(Arc::new(
                    MemoryCheck::default()
                        .critical_flag(mem.critical)
                        .with_timeout(mem.timeout),
                ))?;
            }
            let tasks = &settings.health.tasks;
            if tasks.enabled {
                self.inner.runner.register(Arc::new(
                    TaskCheck::default()
                        .critical_flag(tasks.critical)
                        .with_timeout(tasks.timeout),
                ))?;
            }
        }
        self.inner.runner.run_once(&health_cancel).await;
        let health_task = settings.health.enabled.then(|| {
            self.inner
                .runner
                .clone()
                .spawn_periodic(settings.health.check_interval, health_cancel.clone())
        });

        // Alert engine: rules, channels, evaluation loop.
        let alert_cancel = CancellationToken::new();
        let alert_task = if settings.alerting.enabled {
            for rule in default_rules() {
                self.inner.alerts.register_rule(rule)?;
            }
            for configured in &settings.alerting.rules {
                let rule = convert_rule(configured, settings.alerting.cooldown)?;
                self.inner.alerts.register_rule(rule)?;
            }
            for channel in &settings.alerting.channels {
                match channel {
                    ChannelSettings::Log => self.inner.alerts.add_channel(Arc::new(LogChannel)),
                    ChannelSettings::Webhook { url } => self
                        .inner
                        .alerts
                        .add_channel(Arc::new(WebhookChannel::new(url.clone(), "vitals")?)),
                }
            }

            let store = self.inner.store.clone();
            let engine = self.inner.alerts.clone();
            let cancel = alert_cancel.clone();
            let interval = settings.alerting.evaluation_interval;
            Some(tokio::spawn(async move {
                let mut ticker = Ticker::new(interval);
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => engine.evaluate(&store.gather()),
                    }
                }
            }))
        } else {
            None
        };

        // Recovery supervisor.
        let recovery_cancel = CancellationToken::new();
        let recovery_task = self
            .inner
            .recovery
            .clone()
            .spawn_supervisor(settings.health.check_interval, recovery_cancel.clone());

        // Debouncer and its egress.
        let (debouncer, egress) =
            Debouncer::spawn(DebounceConfig::default(), CancellationToken::new());
        self.inner
            .store
            .register_collector(Box::new(DebounceCollector::new(debouncer.stats())))?;

        *self.inner.running.lock() = Some(Running {
            debouncer,
            watcher: None,
            recovery_cancel,
            recovery_task,
            alert_cancel,
            alert_task,
            health_cancel,
            health_task,
            flusher_cancel,
            flusher_task,
        });
        tracing::info!("monitoring core started");
        Ok(egress)
    }

    /// Stops every engine in reverse start order.
    ///
    /// Idempotent: a second call (or a call before start) is a no-op. All
    /// background tasks are joined before this returns.
    pub async fn stop(&self) {
        {
            let mut phase = self.inner.phase.lock();
            if *phase != Phase::Started {
                *phase = Phase::Stopped;
                return;
            }
            *phase = Phase::Stopped;
        }

        let running = self.inner.running.lock().take();
        let Some(running) = running else {
            return;
        };

        running.debouncer.shutdown().await;
        drop(running.watcher);

        running.recovery_cancel.cancel();
        join_quietly(running.recovery_task, "recovery supervisor").await;

        running.alert_cancel.cancel();
        if let Some(task) = running.alert_task {
            join_quietly(task, "alert evaluator").await;
        }

        running.health_cancel.cancel();
        if let Some(task) = running.health_task {
            join_quietly(task, "health runner").await;
        }

        // The final flush happens between the store's stop signal and its
        // task join: the flusher writes once more after the cancel fires.
        running.flusher_cancel.cancel();
        match running.flusher_task {
            Some(task) => join_quietly(task, "metrics flusher").await,
            None => {
                if let Err(e) = self.inner.store.flush() {
                    tracing::error!(error = %e, "final metrics flush failed");
                }
            }
        }
        tracing::info!("monitoring core stopped");
    }
}

async fn join_quietly(task: JoinHandle<()>, what: &str) {
    if let Err(e) = task.await {
        tracing::error!(error = %e, task = what, "background task terminated abnormally");
    }
}

/// Converts a configured rule into an engine rule. Settings are validated
/// before this point, so unknown names surface as configuration errors.
fn convert_rule(
    configured: &AlertRuleSettings,
    default_cooldown: std::time::Duration,
) -> Result<AlertRule, Error> {
    let op = match configured.op.as_str() {
        "gt" => AlertOp::Gt,
        "gte" => AlertOp::Gte,
        "lt" => AlertOp::Lt,
        "lte" => AlertOp::Lte,
        "eq" => AlertOp::Eq,
        "ne" => AlertOp::Ne,
        "exists" => AlertOp::Exists,
        other => {
            return Err(Error::Config(vitals_config::Error::InvalidAlertOp {
                rule: configured.name.clone(),
                op: other.to_string(),
            }));
        }
    };
    let severity = match configured.severity.as_str() {
        "info" => Severity::Info,
        "warning" => Severity::Warning,
        "critical" => Severity::Critical,
        other => {
            return Err(Error::Config(vitals_config::Error::InvalidSeverity {
                rule: configured.name.clone(),
                severity: other.to_string(),
            }));
        }
    };

    let labels: LabelSet = configured
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let mut rule = AlertRule::new(
        configured.name.clone(),
        configured.metric.clone(),
        op,
        configured.threshold,
        severity,
        configured.message.clone(),
    )
    .with_labels(labels)
    .with_cooldown(configured.cooldown.unwrap_or(default_cooldown));
    rule.enabled = configured.enabled;
    Ok(rule)
}
