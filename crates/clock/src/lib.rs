// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Time source abstraction shared by every stateful engine in the workspace.
//!
//! All time-dependent code takes its readings through the [`Clock`] trait and
//! suspends through [`Ticker`], [`after`], or [`BoundedScope`] so that tests
//! can drive logical time with tokio's paused clock
//! (`#[tokio::test(start_paused = true)]`). The default [`SystemClock`] reads
//! the tokio monotonic clock for intervals and the host wall clock for
//! timestamps.

pub mod error;
pub mod scope;
pub mod ticker;

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use error::ScopeError;
pub use scope::BoundedScope;
pub use ticker::Ticker;

/// An abstract time source.
///
/// Monotonic readings ([`Clock::now`]) are used for interval arithmetic such
/// as cooldowns and debounce windows; wall readings ([`Clock::wall_now`]) are
/// used to stamp samples, health results, and alert instances.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;

    /// Returns the current wall-clock time in UTC.
    fn wall_now(&self) -> DateTime<Utc>;
}

/// A shareable clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// The default clock: tokio monotonic time plus the host wall clock.
///
/// Because the monotonic side goes through `tokio::time`, it honors
/// `tokio::time::pause` and auto-advance in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Returns a shared handle to the default clock.
#[must_use]
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// A cancellable one-shot delay.
///
/// Returns `true` if the full duration elapsed, `false` if `cancel` fired
/// first.
pub async fn after(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn after_fires_when_duration_elapses() {
        let cancel = CancellationToken::new();
        assert!(after(Duration::from_secs(5), &cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn after_returns_false_on_cancellation() {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let task = tokio::spawn(async move { after(Duration::from_secs(60), &child).await });
        tokio::task::yield_now().await;
        cancel.cancel();
        assert!(!task.await.expect("delay task failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn system_clock_tracks_paused_time() {
        let clock = SystemClock;
        let before = clock.now();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.now() - before, Duration::from_secs(3));
    }
}
