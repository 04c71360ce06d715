// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! The debouncer worker.
//!
//! A single task owns the pending buffer, so ingest and flush are serialized
//! by construction and the egress hand-off never blocks while state is held.
//! The pending buffer is a path-keyed set: a repeat arrival for a path
//! replaces the earlier event in place (later wins), so pending length is the
//! number of distinct dirty paths. Batches are emitted in the order their
//! debounce windows close; events within a batch carry no ordering contract.

use crate::event::ChangeEvent;
use crate::stats::DebounceStats;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Tuning knobs for the debouncer.
#[derive(Debug, Clone)]
pub struct DebounceConfig {
    /// Quiet period before a pending burst is flushed.
    pub delay: Duration,
    /// Pending length that triggers an immediate flush.
    pub max_batch: usize,
    /// Pending length that triggers eviction of the oldest quarter.
    pub max_pending: usize,
    /// Ingress channel capacity; arrivals beyond it are dropped.
    pub ingress_capacity: usize,
    /// Egress channel capacity; batches beyond it are dropped.
    pub egress_capacity: usize,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            max_batch: 50,
            max_pending: 1000,
            ingress_capacity: 1024,
            egress_capacity: 16,
        }
    }
}

/// Clonable ingress handle used by event sources.
#[derive(Debug, Clone)]
pub struct DebouncerHandle {
    ingress: mpsc::Sender<ChangeEvent>,
    stats: Arc<DebounceStats>,
}

impl DebouncerHandle {
    /// Offers an event to the debouncer without blocking.
    ///
    /// Returns `false` when the event was shed because the ingress was full
    /// or the debouncer has shut down; the drop is counted either way.
    pub fn offer(&self, event: ChangeEvent) -> bool {
        match self.ingress.try_send(event) {
            Ok(()) => {
                self.stats.record_accepted();
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.stats.record_ingress_drop();
                false
            }
        }
    }
}

/// The debouncer: bounded ingress, deduplicated batched egress.
#[derive(Debug)]
pub struct Debouncer {
    handle: DebouncerHandle,
    cancel: CancellationToken,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Spawns the worker task and returns the debouncer plus the egress
    /// stream of deduplicated batches.
    #[must_use]
    pub fn spawn(
        config: DebounceConfig,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<Vec<ChangeEvent>>) {
        let stats = Arc::new(DebounceStats::default());
        let (ingress_tx, ingress_rx) = mpsc::channel(config.ingress_capacity.max(1));
        let (egress_tx, egress_rx) = mpsc::channel(config.egress_capacity.max(1));

        let state = WorkerState {
            config,
            egress: egress_tx,
            stats: stats.clone(),
            pending: Vec::new(),
            index: HashMap::new(),
            deadline: None,
        };
        let worker_cancel = cancel.clone();
        let worker = tokio::spawn(run_worker(ingress_rx, state, worker_cancel));

        (
            Self {
                handle: DebouncerHandle {
                    ingress: ingress_tx,
                    stats,
                },
                cancel,
                worker: parking_lot::Mutex::new(Some(worker)),
            },
            egress_rx,
        )
    }

    /// Offers an event without blocking; see [`DebouncerHandle::offer`].
    pub fn offer(&self, event: ChangeEvent) -> bool {
        self.handle.offer(event)
    }

    /// A clonable ingress handle for event sources.
    #[must_use]
    pub fn handle(&self) -> DebouncerHandle {
        self.handle.clone()
    }

    /// The shed-event counters.
    #[must_use]
    pub fn stats(&self) -> Arc<DebounceStats> {
        self.handle.stats.clone()
    }

    /// Signals the worker to stop and waits for it.
    ///
    /// Pending events are discarded without emitting; the system is shutting
    /// down and downstream may already be gone. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "debouncer worker terminated abnormally");
            }
        }
    }
}

struct WorkerState {
    config: DebounceConfig,
    egress: mpsc::Sender<Vec<ChangeEvent>>,
    stats: Arc<DebounceStats>,
    /// Deduplicated pending events in arrival order of their paths.
    pending: Vec<ChangeEvent>,
    /// Path → position in `pending`.
    index: HashMap<PathBuf, usize>,
    deadline: Option<Instant>,
}

async fn run_worker(
    mut ingress: mpsc::Receiver<ChangeEvent>,
    mut state: WorkerState,
    cancel: CancellationToken,
) {
    loop {
        let deadline = state.deadline;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                state.pending.clear();
                state.index.clear();
                break;
            }
            maybe = ingress.recv() => match maybe {
                Some(event) => state.ingest(event),
                None => {
                    // All senders gone: emit what is pending and stop.
                    state.flush();
                    break;
                }
            },
            _ = sleep_until_opt(deadline), if deadline.is_some() => state.flush(),
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl WorkerState {
    fn ingest(&mut self, event: ChangeEvent) {
        match self.index.get(&event.path) {
            Some(&at) => {
                // Later event wins; the path keeps its original age.
                self.pending[at] = event;
            }
            None => {
                let _ = self.index.insert(event.path.clone(), self.pending.len());
                self.pending.push(event);
            }
        }

        if self.pending.len() >= self.config.max_pending {
            self.evict_oldest_quarter();
        }

        if self.pending.len() >= self.config.max_batch {
            self.flush();
        } else {
            self.deadline = Some(Instant::now() + self.config.delay);
        }
    }

    fn evict_oldest_quarter(&mut self) {
        let evict = (self.config.max_pending / 4).max(1).min(self.pending.len());
        drop(self.pending.drain(..evict));
        self.index.clear();
        for (at, event) in self.pending.iter().enumerate() {
            let _ = self.index.insert(event.path.clone(), at);
        }
        self.stats.record_evictions(evict as u64);
    }

    fn flush(&mut self) {
        self.deadline = None;
        if self.pending.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.pending);
        self.index.clear();

        match self.egress.try_send(batch) {
            Ok(()) => self.stats.record_batch(),
            Err(TrySendError::Full(batch)) => {
                self.stats.record_egress_drops(batch.len() as u64);
            }
            Err(TrySendError::Closed(_)) => {}
        }

        // Return an oversized dedup index to a sane footprint.
        if self.index.capacity() > 2 * self.config.max_pending {
            self.index = HashMap::with_capacity(self.config.max_pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeKind;

    fn event(path: &str) -> ChangeEvent {
        ChangeEvent::new(ChangeKind::Modified, path)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_dedups_to_one_batch_of_distinct_paths() {
        let config = DebounceConfig {
            delay: Duration::from_millis(100),
            max_batch: 50,
            ..DebounceConfig::default()
        };
        let (debouncer, mut egress) = Debouncer::spawn(config, CancellationToken::new());

        for i in 0..200 {
            assert!(debouncer.offer(event(&format!("/src/file{}.rs", i % 10))));
            tokio::task::yield_now().await;
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        let batch = egress.recv().await.expect("one batch within two delays");
        assert_eq!(batch.len(), 10);
        assert_eq!(debouncer.stats().dropped(), 0);
        assert!(egress.try_recv().is_err(), "exactly one batch emitted");
    }

    #[tokio::test(start_paused = true)]
    async fn later_event_wins_per_path() {
        let (debouncer, mut egress) =
            Debouncer::spawn(DebounceConfig::default(), CancellationToken::new());

        assert!(debouncer.offer(ChangeEvent::new(ChangeKind::Created, "/a.rs")));
        tokio::task::yield_now().await;
        assert!(debouncer.offer(ChangeEvent::new(ChangeKind::Deleted, "/a.rs")));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let batch = egress.recv().await.expect("batch");
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, ChangeKind::Deleted);
    }

    #[tokio::test(start_paused = true)]
    async fn size_cap_flushes_before_the_window_closes() {
        let config = DebounceConfig {
            delay: Duration::from_secs(3600),
            max_batch: 5,
            ..DebounceConfig::default()
        };
        let (debouncer, mut egress) = Debouncer::spawn(config, CancellationToken::new());

        for i in 0..5 {
            assert!(debouncer.offer(event(&format!("/f{i}"))));
        }
        tokio::task::yield_now().await;
        let batch = egress.recv().await.expect("size-capped batch");
        assert_eq!(batch.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_cap_evicts_oldest_quarter() {
        let config = DebounceConfig {
            delay: Duration::from_secs(3600),
            max_batch: 1000,
            max_pending: 100,
            ..DebounceConfig::default()
        };
        let (debouncer, _egress) = Debouncer::spawn(config, CancellationToken::new());

        for i in 0..100 {
            assert!(debouncer.offer(event(&format!("/f{i}"))));
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        assert_eq!(debouncer.stats().snapshot().evicted, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn full_ingress_sheds_and_counts() {
        let config = DebounceConfig {
            ingress_capacity: 1,
            ..DebounceConfig::default()
        };
        let (debouncer, _egress) = Debouncer::spawn(config, CancellationToken::new());

        // Fill the single-slot ingress without letting the worker drain it.
        let mut shed = 0;
        for i in 0..10 {
            if !debouncer.offer(event(&format!("/f{i}"))) {
                shed += 1;
            }
        }
        assert!(shed > 0);
        assert_eq!(debouncer.stats().snapshot().ingress_dropped, shed);
    }

    #[tokio::test(start_paused = true)]
    async fn egress_overflow_is_counted_not_blocked() {
        let config = DebounceConfig {
            delay: Duration::from_millis(10),
            max_batch: 2,
            egress_capacity: 1,
            ..DebounceConfig::default()
        };
        let (debouncer, _egress) = Debouncer::spawn(config, CancellationToken::new());

        // Nobody reads the egress; the second batch must be shed, not block.
        for i in 0..4 {
            assert!(debouncer.offer(event(&format!("/f{i}"))));
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = debouncer.stats().snapshot();
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.egress_dropped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_discards_pending_without_emitting() {
        let (debouncer, mut egress) =
            Debouncer::spawn(DebounceConfig::default(), CancellationToken::new());

        assert!(debouncer.offer(event("/pending.rs")));
        tokio::task::yield_now().await;
        debouncer.shutdown().await;
        debouncer.shutdown().await;

        assert!(egress.recv().await.is_none(), "no batch after shutdown");
    }
}
