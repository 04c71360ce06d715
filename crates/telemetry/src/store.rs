// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! The metric store proper.
//!
//! Series live in a single map behind a read-write lock. Ingestion resolves
//! the series once (read lock on the fast path, write lock only on first
//! touch) and then mutates an atomic cell or, for histograms, a per-series
//! mutex. [`MetricStore::gather`] produces a point-in-time snapshot by copy
//! under the read lock; concurrent mutation never corrupts a snapshot.

use crate::collector::Collector;
use crate::error::Error;
use crate::histogram::HistogramState;
use crate::labels::LabelSet;
use crate::sample::{MetricKind, Sample};
use crate::snapshot::{self, MetricsSnapshot};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::time::Instant;
use vitals_clock::{SharedClock, system_clock};

/// Atomic cell holding an `f64` as its bit pattern.
#[derive(Debug, Default)]
struct CounterCell(AtomicU64);

impl CounterCell {
    fn add(&self, delta: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = f64::from_bits(current) + delta;
            match self.0.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

#[derive(Debug, Default)]
struct GaugeCell(AtomicU64);

impl GaugeCell {
    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

/// Series identity: name plus canonical label set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    name: String,
    labels: LabelSet,
}

#[derive(Clone)]
enum Series {
    Counter(Arc<CounterCell>),
    Gauge(Arc<GaugeCell>),
    Histogram(Arc<Mutex<HistogramState>>),
}

impl Series {
    fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// Construction options for [`MetricStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// When `false`, every ingestion call is a silent no-op.
    pub enabled: bool,
    /// Optional prefix prepended to every series name.
    pub prefix: Option<String>,
    /// Maximum number of live series; series beyond the cap are dropped and
    /// counted.
    pub max_series: usize,
    /// Flush sink path. `None` disables flushing.
    pub output_path: Option<PathBuf>,
    /// Histogram bucket upper bounds, strictly ascending.
    pub buckets: Vec<f64>,
    /// Time source.
    pub clock: SharedClock,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: None,
            max_series: 10_000,
            output_path: None,
            buckets: crate::histogram::DEFAULT_BUCKETS.to_vec(),
            clock: system_clock(),
        }
    }
}

struct StoreInner {
    enabled: AtomicBool,
    prefix: Option<String>,
    max_series: usize,
    output_path: Option<PathBuf>,
    default_bounds: Arc<[f64]>,
    series: RwLock<HashMap<SeriesKey, Series>>,
    collectors: RwLock<Vec<Box<dyn Collector>>>,
    dropped_series: AtomicU64,
    clock: SharedClock,
}

/// Shared handle to the metric store.
///
/// Cheap to clone; all clones observe the same series.
#[derive(Clone)]
pub struct MetricStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for MetricStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricStore")
            .field("enabled", &self.is_enabled())
            .field("series", &self.inner.series.read().len())
            .field("collectors", &self.inner.collectors.read().len())
            .finish()
    }
}

impl MetricStore {
    /// Creates a store from the given options.
    ///
    /// Fails when the bucket bounds are empty or not strictly ascending.
    pub fn new(options: StoreOptions) -> Result<Self, Error> {
        let default_bounds: Arc<[f64]> = Arc::from(options.buckets.as_slice());
        // Validate the bounds once up front; per-series state reuses them.
        let _ = HistogramState::new(default_bounds.clone())?;
        Ok(Self {
            inner: Arc::new(StoreInner {
                enabled: AtomicBool::new(options.enabled),
                prefix: options.prefix,
                max_series: options.max_series,
                output_path: options.output_path,
                default_bounds,
                series: RwLock::new(HashMap::new()),
                collectors: RwLock::new(Vec::new()),
                dropped_series: AtomicU64::new(0),
                clock: options.clock,
            }),
        })
    }

    /// A permanently disabled store. Every write is a no-op; used by the
    /// module-level accessor before a monitor is installed.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(StoreOptions {
            enabled: false,
            ..StoreOptions::default()
        })
        .expect("default options are valid")
    }

    /// Whether the store accepts observations.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    /// Number of series dropped because the series cap was reached.
    #[must_use]
    pub fn dropped_series(&self) -> u64 {
        self.inner.dropped_series.load(Ordering::Relaxed)
    }

    fn qualified(&self, name: &str) -> String {
        match &self.inner.prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name.to_string(),
        }
    }

    /// Resolves (creating on first touch) the series for `(name, labels)`.
    ///
    /// Returns `Ok(None)` when the store is disabled or the series cap is
    /// reached; the caller drops the observation silently.
    fn resolve(
        &self,
        name: &str,
        labels: LabelSet,
        kind: MetricKind,
    ) -> Result<Option<Series>, Error> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if !self.is_enabled() {
            return Ok(None);
        }
        let key = SeriesKey {
            name: self.qualified(name),
            labels,
        };

        if let Some(series) = self.inner.series.read().get(&key) {
            if series.kind() != kind {
                return Err(Error::KindConflict {
                    name: key.name,
                    existing: series.kind(),
                });
            }
            return Ok(Some(series.clone()));
        }

        let mut map = self.inner.series.write();
        if let Some(series) = map.get(&key) {
            if series.kind() != kind {
                return Err(Error::KindConflict {
                    name: key.name,
                    existing: series.kind(),
                });
            }
            return Ok(Some(series.clone()));
        }
        if map.len() >= self.inner.max_series {
            let _ = self.inner.dropped_series.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }
        let series = match kind {
            MetricKind::Counter => Series::Counter(Arc::new(CounterCell::default())),
            MetricKind::Gauge => Series::Gauge(Arc::new(GaugeCell::default())),
            MetricKind::Histogram => Series::Histogram(Arc::new(Mutex::new(HistogramState::new(
                self.inner.default_bounds.clone(),
            )?))),
        };
        let _ = map.insert(key, series.clone());
        Ok(Some(series))
    }

    /// Increments a counter by one.
    pub fn counter(&self, name: &str, labels: LabelSet) {
        if let Err(e) = self.counter_add(name, labels, 1.0) {
            tracing::debug!(error = %e, metric = name, "counter increment dropped");
        }
    }

    /// Adds `delta` (≥ 0) to a counter.
    ///
    /// A negative delta is a programmer error and is returned synchronously;
    /// a disabled store accepts and discards the observation.
    pub fn counter_add(&self, name: &str, labels: LabelSet, delta: f64) -> Result<(), Error> {
        if delta < 0.0 {
            return Err(Error::NegativeCounterDelta {
                name: name.to_string(),
                delta,
            });
        }
        if let Some(Series::Counter(cell)) = self.resolve(name, labels, MetricKind::Counter)? {
            cell.add(delta);
        }
        Ok(())
    }

    /// Overwrites a gauge with the latest observation.
    pub fn gauge(&self, name: &str, labels: LabelSet, value: f64) {
        match self.resolve(name, labels, MetricKind::Gauge) {
            Ok(Some(Series::Gauge(cell))) => cell.set(value),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, metric = name, "gauge observation dropped"),
        }
    }

    /// Records one histogram observation.
    pub fn histogram(&self, name: &str, labels: LabelSet, value: f64) {
        match self.resolve(name, labels, MetricKind::Histogram) {
            Ok(Some(Series::Histogram(state))) => state.lock().observe(value),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, metric = name, "histogram observation dropped"),
        }
    }

    /// Returns a pre-resolved counter cell for hot paths.
    ///
    /// The handle bypasses the series map on every increment. When the store
    /// is disabled or the series cap is reached, the handle is a no-op.
    #[must_use]
    pub fn counter_handle(&self, name: &str, labels: LabelSet) -> CounterHandle {
        match self.resolve(name, labels, MetricKind::Counter) {
            Ok(Some(Series::Counter(cell))) => CounterHandle { cell: Some(cell) },
            Ok(_) => CounterHandle::noop(),
            Err(e) => {
                tracing::debug!(error = %e, metric = name, "counter handle unavailable");
                CounterHandle::noop()
            }
        }
    }

    /// Starts a scoped timer.
    ///
    /// On [`Timer::stop`] (or drop) the elapsed duration in seconds is
    /// observed into the histogram `<name>_duration_seconds`.
    #[must_use]
    pub fn timer(&self, name: &str, labels: LabelSet) -> Timer {
        Timer {
            store: self.clone(),
            name: name.to_string(),
            labels,
            start: self.inner.clock.now(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Registers a pull-based collector polled at gather time.
    pub fn register_collector(&self, collector: Box<dyn Collector>) -> Result<(), Error> {
        if collector.name().is_empty() {
            return Err(Error::EmptyName);
        }
        self.inner.collectors.write().push(collector);
        Ok(())
    }

    /// Produces a point-in-time snapshot of every series.
    ///
    /// Histograms expand into one sample per bucket bound (synthetic `le`
    /// label, three fractional digits) plus `<name>_count` and `<name>_sum`
    /// samples. All samples, including collector output, are stamped with the
    /// snapshot time.
    #[must_use]
    pub fn gather(&self) -> Vec<Sample> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let now = self.inner.clock.wall_now();
        let mut samples = Vec::new();
        {
            let map = self.inner.series.read();
            for (key, series) in map.iter() {
                match series {
                    Series::Counter(cell) => samples.push(Sample::new(
                        key.name.clone(),
                        MetricKind::Counter,
                        cell.get(),
                        key.labels.clone(),
                        now,
                    )),
                    Series::Gauge(cell) => samples.push(Sample::new(
                        key.name.clone(),
                        MetricKind::Gauge,
                        cell.get(),
                        key.labels.clone(),
                        now,
                    )),
                    Series::Histogram(state) => {
                        let state = state.lock().clone();
                        for (bound, cumulative) in
                            state.bounds().iter().zip(state.cumulative().iter())
                        {
                            let labels = key.labels.clone().with("le", format!("{bound:.3}"));
                            samples.push(Sample::new(
                                format!("{}_bucket", key.name),
                                MetricKind::Histogram,
                                *cumulative as f64,
                                labels,
                                now,
                            ));
                        }
                        samples.push(Sample::new(
                            format!("{}_count", key.name),
                            MetricKind::Histogram,
                            state.count() as f64,
                            key.labels.clone(),
                            now,
                        ));
                        samples.push(Sample::new(
                            format!("{}_sum", key.name),
                            MetricKind::Histogram,
                            state.sum(),
                            key.labels.clone(),
                            now,
                        ));
                    }
                }
            }
        }
        for collector in self.inner.collectors.read().iter() {
            for mut sample in collector.collect() {
                sample.timestamp = now;
                samples.push(sample);
            }
        }
        samples.sort_by(|a, b| (a.name.as_str(), &a.labels).cmp(&(b.name.as_str(), &b.labels)));
        samples
    }

    /// Builds the full flush envelope (samples plus process/runtime info).
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::capture(self.inner.clock.wall_now(), self.gather())
    }

    /// Writes the snapshot envelope to the configured sink.
    ///
    /// A store without an output path flushes to nowhere and returns `Ok`.
    /// I/O failures are surfaced to the caller but leave ingestion untouched.
    pub fn flush(&self) -> Result<(), Error> {
        let Some(path) = &self.inner.output_path else {
            return Ok(());
        };
        let snap = self.snapshot();
        snapshot::write_snapshot(path, &snap)
    }
}

/// A clonable, pre-resolved counter cell.
#[derive(Debug, Clone, Default)]
pub struct CounterHandle {
    cell: Option<Arc<CounterCell>>,
}

impl CounterHandle {
    /// A handle that discards every increment.
    #[must_use]
    pub fn noop() -> Self {
        Self { cell: None }
    }

    /// Increments by one.
    pub fn inc(&self) {
        self.add(1.0);
    }

    /// Adds `delta`; negative deltas are discarded.
    pub fn add(&self, delta: f64) {
        if delta < 0.0 {
            return;
        }
        if let Some(cell) = &self.cell {
            cell.add(delta);
        }
    }

    /// Current value of the cell (0 for a no-op handle).
    #[must_use]
    pub fn value(&self) -> f64 {
        self.cell.as_ref().map_or(0.0, |c| c.get())
    }
}

/// Scoped duration measurement; see [`MetricStore::timer`].
#[derive(Debug)]
pub struct Timer {
    store: MetricStore,
    name: String,
    labels: LabelSet,
    start: Instant,
    stopped: AtomicBool,
}

impl Timer {
    /// Observes the elapsed duration. Idempotent and safe under concurrent
    /// stop: exactly one caller records the observation.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let elapsed = self.store.inner.clock.now() - self.start;
        self.store.histogram(
            &format!("{}_duration_seconds", self.name),
            self.labels.clone(),
            elapsed.as_secs_f64(),
        );
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> MetricStore {
        MetricStore::new(StoreOptions::default()).expect("valid options")
    }

    #[test]
    fn counters_accumulate_per_label_set() {
        let store = store();
        store.counter("req", LabelSet::from([("m", "GET")]));
        store.counter("req", LabelSet::from([("m", "GET")]));
        store.counter("req", LabelSet::from([("m", "POST")]));

        let samples: Vec<_> = store
            .gather()
            .into_iter()
            .filter(|s| s.name == "req")
            .collect();
        assert_eq!(samples.len(), 2);
        let get = samples
            .iter()
            .find(|s| s.labels.get("m") == Some("GET"))
            .expect("GET series");
        let post = samples
            .iter()
            .find(|s| s.labels.get("m") == Some("POST"))
            .expect("POST series");
        assert_eq!(get.value, 2.0);
        assert_eq!(post.value, 1.0);
    }

    #[test]
    fn counter_values_never_decrease_across_gathers() {
        let store = store();
        let mut last = 0.0;
        for round in 0..5 {
            for _ in 0..=round {
                store.counter("ops", LabelSet::empty());
            }
            let current = store
                .gather()
                .into_iter()
                .find(|s| s.name == "ops")
                .expect("ops series")
                .value;
            assert!(current >= last);
            last = current;
        }
    }

    #[test]
    fn negative_delta_is_a_programmer_error() {
        let store = store();
        let err = store
            .counter_add("ops", LabelSet::empty(), -1.0)
            .expect_err("negative delta must be rejected");
        assert!(matches!(err, Error::NegativeCounterDelta { .. }));
    }

    #[test]
    fn series_identity_ignores_label_insertion_order() {
        let store = store();
        store.counter("req", LabelSet::empty().with("a", "1").with("b", "2"));
        store.counter("req", LabelSet::empty().with("b", "2").with("a", "1"));
        let samples: Vec<_> = store
            .gather()
            .into_iter()
            .filter(|s| s.name == "req")
            .collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 2.0);
    }

    #[test]
    fn disabled_store_silently_drops() {
        let store = MetricStore::new(StoreOptions {
            enabled: false,
            ..StoreOptions::default()
        })
        .expect("valid options");
        store
            .counter_add("req", LabelSet::empty(), 5.0)
            .expect("disabled stores do not error");
        store.gauge("g", LabelSet::empty(), 1.0);
        assert!(store.gather().is_empty());
    }

    #[test]
    fn kind_conflict_is_reported() {
        let store = store();
        store.gauge("mixed", LabelSet::empty(), 1.0);
        let err = store
            .counter_add("mixed", LabelSet::empty(), 1.0)
            .expect_err("kind conflicts must be rejected");
        assert!(matches!(err, Error::KindConflict { .. }));
    }

    #[test]
    fn series_cap_drops_and_counts() {
        let store = MetricStore::new(StoreOptions {
            max_series: 2,
            ..StoreOptions::default()
        })
        .expect("valid options");
        for i in 0..5 {
            store.counter("c", LabelSet::from([("i", i.to_string())]));
        }
        assert_eq!(store.gather().len(), 2);
        assert_eq!(store.dropped_series(), 3);
    }

    #[test]
    fn gauge_overwrites_last_observation() {
        let store = store();
        store.gauge("load", LabelSet::empty(), 0.5);
        store.gauge("load", LabelSet::empty(), 0.9);
        let sample = store
            .gather()
            .into_iter()
            .find(|s| s.name == "load")
            .expect("load series");
        assert_eq!(sample.value, 0.9);
    }

    #[test]
    fn prefix_applies_to_all_series() {
        let store = MetricStore::new(StoreOptions {
            prefix: Some("svc".into()),
            ..StoreOptions::default()
        })
        .expect("valid options");
        store.counter("req", LabelSet::empty());
        assert!(store.gather().iter().any(|s| s.name == "svc_req"));
    }

    #[test]
    fn collector_samples_are_restamped_and_included() {
        struct Fixed;
        impl Collector for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn collect(&self) -> Vec<Sample> {
                vec![Sample::new(
                    "synthetic",
                    MetricKind::Gauge,
                    42.0,
                    LabelSet::empty(),
                    chrono::DateTime::<chrono::Utc>::MIN_UTC,
                )]
            }
        }
        let store = store();
        store
            .register_collector(Box::new(Fixed))
            .expect("named collector registers");
        let sample = store
            .gather()
            .into_iter()
            .find(|s| s.name == "synthetic")
            .expect("collector sample present");
        assert_eq!(sample.value, 42.0);
        assert!(sample.timestamp > chrono::DateTime::<chrono::Utc>::MIN_UTC);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_observes_elapsed_seconds_once() {
        let store = store();
        let timer = store.timer("build", LabelSet::empty());
        tokio::time::advance(std::time::Duration::from_millis(300)).await;
        timer.stop();
        timer.stop();
        drop(timer);

        let count = store
            .gather()
            .into_iter()
            .find(|s| s.name == "build_duration_seconds_count")
            .expect("timer histogram present");
        assert_eq!(count.value, 1.0);
        let sum = store
            .gather()
            .into_iter()
            .find(|s| s.name == "build_duration_seconds_sum")
            .expect("timer sum present");
        assert!((sum.value - 0.3).abs() < 1e-6);
    }

    #[test]
    fn histogram_expansion_carries_le_labels() {
        let store = store();
        store.histogram("lat", LabelSet::empty(), 0.05);
        let buckets: Vec<_> = store
            .gather()
            .into_iter()
            .filter(|s| s.name == "lat_bucket")
            .collect();
        assert_eq!(buckets.len(), crate::histogram::DEFAULT_BUCKETS.len());
        assert!(buckets.iter().all(|s| s.labels.get("le").is_some()));
        let le_100ms = buckets
            .iter()
            .find(|s| s.labels.get("le") == Some("0.100"))
            .expect("0.100 bucket present");
        assert_eq!(le_100ms.value, 1.0);
    }
}
