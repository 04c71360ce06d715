// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Deadline-bounded unit-of-work scopes.
//!
//! A [`BoundedScope`] carries a deadline and a cancellation signal derived
//! from a parent token. Health checks, recovery attempts, and webhook sends
//! all run inside one, so every long-running operation honors both the
//! supervisor shutdown signal and its own per-operation timeout.

use crate::error::ScopeError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A unit of work bounded by a deadline and a cancellation signal.
#[derive(Debug, Clone)]
pub struct BoundedScope {
    cancel: CancellationToken,
    timeout: Duration,
}

impl BoundedScope {
    /// Creates a scope whose cancellation is a child of `parent` and whose
    /// deadline is `timeout` from the first call to [`BoundedScope::run`].
    #[must_use]
    pub fn new(parent: &CancellationToken, timeout: Duration) -> Self {
        Self {
            cancel: parent.child_token(),
            timeout,
        }
    }

    /// Creates a detached scope with no parent signal.
    #[must_use]
    pub fn detached(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout,
        }
    }

    /// The cancellation token observed by this scope.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The timeout this scope was created with.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `fut` to completion unless the deadline expires or the parent
    /// signal fires first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ScopeError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScopeError::Cancelled),
            _ = tokio::time::sleep(self.timeout) => Err(ScopeError::Elapsed { timeout: self.timeout }),
            value = fut => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn completes_within_deadline() {
        let scope = BoundedScope::detached(Duration::from_secs(1));
        let out = scope
            .run(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                7
            })
            .await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn expires_past_deadline() {
        let scope = BoundedScope::detached(Duration::from_millis(50));
        let out = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
            })
            .await;
        assert_eq!(
            out,
            Err(ScopeError::Elapsed {
                timeout: Duration::from_millis(50)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_wins() {
        let parent = CancellationToken::new();
        let scope = BoundedScope::new(&parent, Duration::from_secs(10));
        parent.cancel();
        let out = scope.run(async { 1 }).await;
        assert_eq!(out, Err(ScopeError::Cancelled));
    }
}
