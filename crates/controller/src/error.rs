// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the lifecycle supervisor.

/// Errors that can occur constructing, starting, or wiring the monitor.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The settings handed to the core failed validation.
    #[error(transparent)]
    Config(#[from] vitals_config::Error),

    /// `start` was called on an already started monitor.
    #[error("Monitor is already started; start is not reentrant")]
    AlreadyStarted,

    /// An operation that needs running engines was called before `start`.
    #[error("Monitor is not running")]
    NotStarted,

    /// The metric store rejected its construction options.
    #[error(transparent)]
    Telemetry(#[from] vitals_telemetry::Error),

    /// A health check failed to register.
    #[error(transparent)]
    Health(#[from] vitals_health::Error),

    /// An alert rule or channel failed to register.
    #[error(transparent)]
    Alert(#[from] vitals_alert::Error),

    /// A recovery rule failed to register.
    #[error(transparent)]
    Recovery(#[from] vitals_recovery::Error),

    /// The filesystem watcher failed to initialize or register a root.
    #[error(transparent)]
    Watch(#[from] vitals_debounce::Error),
}
