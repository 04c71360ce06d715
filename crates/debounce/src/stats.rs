// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Shed-event accounting.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for every way the debouncer sheds or moves events.
///
/// Shed events are never surfaced as errors; these counters are the only
/// record. The controller exposes them as metric samples through a pull
/// collector.
#[derive(Debug, Default)]
pub struct DebounceStats {
    events_in: AtomicU64,
    ingress_dropped: AtomicU64,
    evicted: AtomicU64,
    egress_dropped: AtomicU64,
    batches: AtomicU64,
}

impl DebounceStats {
    pub(crate) fn record_accepted(&self) {
        let _ = self.events_in.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ingress_drop(&self) {
        let _ = self.ingress_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, n: u64) {
        let _ = self.evicted.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_egress_drops(&self, n: u64) {
        let _ = self.egress_dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self) {
        let _ = self.batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Total events that were shed anywhere in the pipeline.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.ingress_dropped.load(Ordering::Relaxed)
            + self.evicted.load(Ordering::Relaxed)
            + self.egress_dropped.load(Ordering::Relaxed)
    }

    /// A point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_in: self.events_in.load(Ordering::Relaxed),
            ingress_dropped: self.ingress_dropped.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            egress_dropped: self.egress_dropped.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }
}

/// A copy of the debounce counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Events accepted into the ingress.
    pub events_in: u64,
    /// Events dropped because the ingress was full.
    pub ingress_dropped: u64,
    /// Events evicted from the pending buffer under memory pressure.
    pub evicted: u64,
    /// Events dropped because the egress was full.
    pub egress_dropped: u64,
    /// Batches emitted downstream.
    pub batches: u64,
}
