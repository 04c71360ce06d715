// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! The recovery action capability and the standard actions.
//!
//! Actions that reach outside the core (builder cache, subsystems, the
//! component registry) act through injected collaborator capabilities, so the
//! external systems stay at the interface boundary. Actions carry no rollback
//! semantics; they are assumed idempotent enough for the retry budget they
//! are deployed with.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Error type produced by actions and collaborators.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// A unit of recovery work with a name and a description.
#[async_trait]
pub trait RecoveryAction: Send + Sync {
    /// A short identifier used in logs.
    fn name(&self) -> &str;

    /// A one-line description of what the action does.
    fn description(&self) -> &str;

    /// Runs the action against the named failing check.
    async fn execute(&self, check: &str) -> Result<(), ActionError>;
}

/// A source of reclaimable memory (caches, pools) registered by the host.
pub trait MemoryReclaimer: Send + Sync {
    /// Releases what can be released; returns the approximate bytes freed.
    fn reclaim(&self) -> u64;
}

/// An external builder's cache.
#[async_trait]
pub trait BuilderCache: Send + Sync {
    /// Drops all cached build artifacts.
    async fn clear(&self) -> Result<(), ActionError>;
}

/// An external collaborator that can be restarted in place.
#[async_trait]
pub trait Subsystem: Send + Sync {
    /// The subsystem's name, used in logs.
    fn name(&self) -> &str;

    /// Stops and restarts the subsystem.
    async fn restart(&self) -> Result<(), ActionError>;
}

/// An external component registry that can be re-scanned.
#[async_trait]
pub trait ComponentRegistry: Send + Sync {
    /// Rebuilds the registry from its sources.
    async fn refresh(&self) -> Result<(), ActionError>;
}

/// Releases registered reclaimable memory.
///
/// This runtime has no collector to kick; the equivalent lever is dropping
/// every cache the host has registered as reclaimable.
#[derive(Clone, Default)]
pub struct ReclaimMemoryAction {
    reclaimers: Vec<Arc<dyn MemoryReclaimer>>,
}

impl ReclaimMemoryAction {
    /// Creates the action over the given reclaimable sources.
    #[must_use]
    pub fn new(reclaimers: Vec<Arc<dyn MemoryReclaimer>>) -> Self {
        Self { reclaimers }
    }
}

#[async_trait]
impl RecoveryAction for ReclaimMemoryAction {
    fn name(&self) -> &str {
        "reclaim-memory"
    }

    fn description(&self) -> &str {
        "release registered reclaimable caches and pools"
    }

    async fn execute(&self, check: &str) -> Result<(), ActionError> {
        let mut freed = 0u64;
        for reclaimer in &self.reclaimers {
            freed += reclaimer.reclaim();
        }
        tracing::info!(check, freed_bytes = freed, "reclaimed memory");
        Ok(())
    }
}

/// Sleeps for a fixed duration, giving a struggling resource room to settle.
#[derive(Debug, Clone, Copy)]
pub struct WaitAction {
    duration: Duration,
}

impl WaitAction {
    /// Creates an action waiting for `duration`.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl RecoveryAction for WaitAction {
    fn name(&self) -> &str {
        "wait"
    }

    fn description(&self) -> &str {
        "pause before the next recovery step"
    }

    async fn execute(&self, _check: &str) -> Result<(), ActionError> {
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}

/// Records the failure at error level; useful as a terminal action.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFailureAction;

#[async_trait]
impl RecoveryAction for LogFailureAction {
    fn name(&self) -> &str {
        "log-failure"
    }

    fn description(&self) -> &str {
        "record the failing check for the operator"
    }

    async fn execute(&self, check: &str) -> Result<(), ActionError> {
        tracing::error!(check, "health check failing; recovery in progress");
        Ok(())
    }
}

/// Clears an external builder's cache.
#[derive(Clone)]
pub struct ClearCacheAction {
    cache: Arc<dyn BuilderCache>,
}

impl ClearCacheAction {
    /// Creates the action over the given cache collaborator.
    #[must_use]
    pub fn new(cache: Arc<dyn BuilderCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl RecoveryAction for ClearCacheAction {
    fn name(&self) -> &str {
        "clear-cache"
    }

    fn description(&self) -> &str {
        "drop the builder's cached artifacts"
    }

    async fn execute(&self, check: &str) -> Result<(), ActionError> {
        tracing::info!(check, "clearing builder cache");
        self.cache.clear().await
    }
}

/// Restarts an external subsystem in place.
#[derive(Clone)]
pub struct RestartSubsystemAction {
    subsystem: Arc<dyn Subsystem>,
}

impl RestartSubsystemAction {
    /// Creates the action over the given subsystem collaborator.
    #[must_use]
    pub fn new(subsystem: Arc<dyn Subsystem>) -> Self {
        Self { subsystem }
    }
}

#[async_trait]
impl RecoveryAction for RestartSubsystemAction {
    fn name(&self) -> &str {
        "restart-subsystem"
    }

    fn description(&self) -> &str {
        "stop and restart the collaborating subsystem"
    }

    async fn execute(&self, check: &str) -> Result<(), ActionError> {
        tracing::warn!(check, subsystem = self.subsystem.name(), "restarting subsystem");
        self.subsystem.restart().await
    }
}

/// Re-scans an external component registry.
#[derive(Clone)]
pub struct RefreshRegistryAction {
    registry: Arc<dyn ComponentRegistry>,
}

impl RefreshRegistryAction {
    /// Creates the action over the given registry collaborator.
    #[must_use]
    pub fn new(registry: Arc<dyn ComponentRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl RecoveryAction for RefreshRegistryAction {
    fn name(&self) -> &str {
        "refresh-registry"
    }

    fn description(&self) -> &str {
        "rebuild the component registry from its sources"
    }

    async fn execute(&self, check: &str) -> Result<(), ActionError> {
        tracing::info!(check, "refreshing component registry");
        self.registry.refresh().await
    }
}
