// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! In-process metric store.
//!
//! The store keeps counters, gauges, and histograms keyed by series identity
//! (name plus canonical label set), supports pull-based [`Collector`]s, and
//! periodically flushes a point-in-time JSON snapshot to a configured path.
//!
//! Design notes:
//! - Series identity is insensitive to label insertion order; see
//!   [`labels::LabelSet`].
//! - Hot counter writes go through a pre-resolved [`store::CounterHandle`]
//!   backed by an atomic cell, so steady-state increments never touch the
//!   series map lock.
//! - Flush failures are logged and surfaced but never poison ingestion.

pub mod collector;
pub mod error;
pub mod flusher;
pub mod histogram;
pub mod labels;
pub mod sample;
pub mod snapshot;
pub mod store;

pub use collector::Collector;
pub use error::Error;
pub use histogram::DEFAULT_BUCKETS;
pub use labels::LabelSet;
pub use sample::{MetricKind, Sample};
pub use snapshot::MetricsSnapshot;
pub use store::{CounterHandle, MetricStore, StoreOptions, Timer};
