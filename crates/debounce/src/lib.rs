// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! File-change debouncer.
//!
//! Absorbs bursts of up to thousands of filesystem events and emits batched,
//! path-deduplicated outputs to a downstream consumer under bounded memory.
//! Backpressure is lossy by design at the ingress (the filesystem cannot be
//! throttled) and at the egress hand-off; every shed event is counted.
//!
//! The [`watch`] module adapts platform file notifications (via `notify`)
//! into the debouncer's ingress.

pub mod debouncer;
pub mod error;
pub mod event;
pub mod stats;
pub mod watch;

pub use debouncer::{DebounceConfig, Debouncer, DebouncerHandle};
pub use error::Error;
pub use event::{ChangeEvent, ChangeKind};
pub use stats::{DebounceStats, StatsSnapshot};
pub use watch::PathWatcher;
