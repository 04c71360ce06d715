// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Self-healing engine.
//!
//! Binds failing health checks to ordered sequences of recovery actions. A
//! periodic supervisor watches the health runner's results; a check that has
//! failed often enough (and is past its cooldown, and under its attempt cap)
//! gets one deadline-bounded recovery attempt: actions run in order, and
//! after each successful action the check is re-probed following a short
//! stabilization period. The attempt ends early the moment the check is
//! healthy again.

pub mod action;
pub mod engine;
pub mod error;
pub mod history;
pub mod rule;

pub use action::{
    ActionError, BuilderCache, ClearCacheAction, ComponentRegistry, LogFailureAction,
    MemoryReclaimer, ReclaimMemoryAction, RecoveryAction, RefreshRegistryAction,
    RestartSubsystemAction, Subsystem, WaitAction,
};
pub use engine::RecoveryEngine;
pub use error::Error;
pub use history::RecoveryHistory;
pub use rule::RecoveryRule;
