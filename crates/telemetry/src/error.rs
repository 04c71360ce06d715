// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the metric store.

use std::path::PathBuf;

/// Errors that can occur in the metric store.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A counter was asked to move backwards.
    #[error("Negative delta {delta} for counter '{name}': counters never decrease")]
    NegativeCounterDelta {
        /// The counter series name.
        name: String,
        /// The rejected delta.
        delta: f64,
    },

    /// A series or collector was registered with an empty name.
    #[error("Metric names must not be empty")]
    EmptyName,

    /// The same series name was used with a different metric kind.
    #[error("Series '{name}' is already registered as a {existing:?}")]
    KindConflict {
        /// The series name.
        name: String,
        /// The kind the series was first registered with.
        existing: crate::sample::MetricKind,
    },

    /// Histogram bucket bounds were empty or not strictly ascending.
    #[error("Invalid histogram buckets: {details}")]
    InvalidBuckets {
        /// Human-readable details of the validation failure.
        details: String,
    },

    /// The snapshot could not be serialized.
    #[error("Failed to serialize metrics snapshot: {details}")]
    SnapshotSerialize {
        /// Human-readable details of the serialization failure.
        details: String,
    },

    /// Writing the flush sink failed.
    #[error("Failed to write metrics snapshot to '{path}': {details}")]
    FlushIo {
        /// The configured output path.
        path: PathBuf,
        /// Human-readable details of the I/O failure.
        details: String,
    },
}
