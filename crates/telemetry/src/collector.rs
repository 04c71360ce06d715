// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Pull-based metric sources.

use crate::sample::Sample;

/// A pull-based source of synthetic samples.
///
/// Registered collectors are polled at gather time; their samples are
/// re-stamped with the snapshot timestamp and appended to the snapshot
/// alongside the store's own series.
pub trait Collector: Send + Sync {
    /// A short identifier used in logs.
    fn name(&self) -> &str;

    /// Produces the collector's current samples.
    fn collect(&self) -> Vec<Sample>;
}
