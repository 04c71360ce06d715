// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! The flush envelope and its atomic writer.
//!
//! The sink is overwritten atomically: the snapshot is serialized to a
//! temporary file in the target directory and renamed into place, so a
//! reader never observes a torn write.

use crate::error::Error;
use crate::sample::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// The JSON envelope written by [`crate::MetricStore::flush`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Every current sample, histograms expanded.
    pub metrics: Vec<Sample>,
    /// Process and runtime readings taken with the snapshot.
    pub system: SystemInfo,
}

/// Process-level readings included in the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Runtime readings.
    pub runtime: RuntimeInfo,
    /// Process identity.
    pub process: ProcessInfo,
}

/// Runtime readings.
///
/// The collector fields (`gc_runs`, `gc_pause_ns`) are kept for envelope
/// compatibility with consumers that also scrape collected runtimes; this
/// runtime reports zero for both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeInfo {
    /// Live asynchronous task count.
    pub tasks: u64,
    /// Resident memory in bytes.
    pub memory_alloc: u64,
    /// Virtual memory in bytes.
    pub memory_heap: u64,
    /// Collector run count (always 0 here).
    pub gc_runs: u64,
    /// Cumulative collector pause (always 0 here).
    pub gc_pause_ns: u64,
}

impl RuntimeInfo {
    /// Captures the current runtime readings, best effort.
    #[must_use]
    pub fn capture() -> Self {
        let tasks = tokio::runtime::Handle::try_current()
            .map(|h| h.metrics().num_alive_tasks() as u64)
            .unwrap_or(0);
        let (memory_alloc, memory_heap) = memory_stats::memory_stats()
            .map(|m| (m.physical_mem as u64, m.virtual_mem as u64))
            .unwrap_or((0, 0));
        Self {
            tasks,
            memory_alloc,
            memory_heap,
            gc_runs: 0,
            gc_pause_ns: 0,
        }
    }
}

/// Process identity readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// The operating-system process id.
    pub pid: u32,
}

impl MetricsSnapshot {
    /// Assembles an envelope around already-gathered samples.
    #[must_use]
    pub fn capture(timestamp: DateTime<Utc>, metrics: Vec<Sample>) -> Self {
        Self {
            timestamp,
            metrics,
            system: SystemInfo {
                runtime: RuntimeInfo::capture(),
                process: ProcessInfo {
                    pid: std::process::id(),
                },
            },
        }
    }
}

/// Serializes `snapshot` and atomically replaces `path` with it.
pub fn write_snapshot(path: &Path, snapshot: &MetricsSnapshot) -> Result<(), Error> {
    let body = serde_json::to_vec_pretty(snapshot).map_err(|e| Error::SnapshotSerialize {
        details: e.to_string(),
    })?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir),
        None => tempfile::NamedTempFile::new(),
    }
    .map_err(|e| Error::FlushIo {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    tmp.write_all(&body).map_err(|e| Error::FlushIo {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    let _ = tmp.persist(path).map_err(|e| Error::FlushIo {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSet;
    use crate::sample::MetricKind;

    #[test]
    fn write_is_atomic_and_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metrics.json");

        let snapshot = MetricsSnapshot::capture(
            Utc::now(),
            vec![Sample::new(
                "req",
                MetricKind::Counter,
                3.0,
                LabelSet::from([("m", "GET")]),
                Utc::now(),
            )],
        );
        write_snapshot(&path, &snapshot).expect("write succeeds");

        let body = std::fs::read(&path).expect("sink readable");
        let parsed: MetricsSnapshot = serde_json::from_slice(&body).expect("valid envelope");
        assert_eq!(parsed.metrics.len(), 1);
        assert_eq!(parsed.metrics[0].name, "req");
        assert_eq!(parsed.system.process.pid, std::process::id());
    }

    #[test]
    fn unwritable_sink_surfaces_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("metrics.json");
        let snapshot = MetricsSnapshot::capture(Utc::now(), Vec::new());
        let err = write_snapshot(&path, &snapshot).expect_err("missing directory fails");
        assert!(matches!(err, Error::FlushIo { .. }));
    }
}
