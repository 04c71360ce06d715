// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Periodic tick streams for background tasks.

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A periodic tick source.
///
/// Missed ticks are skipped rather than bursted, so a slow consumer sees at
/// most one pending tick. The first tick fires one full period after
/// construction.
#[derive(Debug)]
pub struct Ticker {
    interval: Interval,
}

impl Ticker {
    /// Creates a ticker firing every `period`.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// Waits for the next tick and returns its instant.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
