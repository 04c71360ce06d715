// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for configuration validation.

use miette::Diagnostic;

/// Errors that can occur validating monitoring settings.
///
/// Any of these is fatal for the subsystem at start.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// The log level is not one of the recognized names.
    #[error("Invalid log level '{level}': expected debug, info, warn, error, or fatal")]
    #[diagnostic(code(vitals::config::invalid_log_level))]
    InvalidLogLevel {
        /// The rejected level.
        level: String,
    },

    /// An output path contains a parent-directory component.
    #[error("Output path '{path}' must not contain '..'")]
    #[diagnostic(code(vitals::config::unsafe_output_path))]
    UnsafeOutputPath {
        /// The rejected path.
        path: String,
    },

    /// The admin bind address could not be parsed as host:port.
    #[error("Invalid bind address '{bind_address}': {details}")]
    #[diagnostic(code(vitals::config::invalid_bind_address))]
    InvalidBindAddress {
        /// The rejected address.
        bind_address: String,
        /// Human-readable details of the parsing failure.
        details: String,
    },

    /// The admin TCP port is outside [1, 65535].
    #[error("Invalid TCP port {port}: expected 1..=65535")]
    #[diagnostic(code(vitals::config::invalid_port))]
    InvalidPort {
        /// The rejected port.
        port: u32,
    },

    /// The sample rate is outside [0, 1].
    #[error("Invalid sample rate {value}: expected a fraction in [0, 1]")]
    #[diagnostic(code(vitals::config::invalid_sample_rate))]
    InvalidSampleRate {
        /// The rejected value.
        value: f64,
    },

    /// The error-rate threshold is outside [0, 1].
    #[error("Invalid error-rate threshold {value}: expected a fraction in [0, 1]")]
    #[diagnostic(code(vitals::config::invalid_error_rate))]
    InvalidErrorRate {
        /// The rejected value.
        value: f64,
    },

    /// An interval that drives a background task is zero.
    #[error("'{field}' must be a non-zero duration")]
    #[diagnostic(code(vitals::config::zero_interval))]
    ZeroInterval {
        /// The offending field.
        field: &'static str,
    },

    /// A configured alert rule uses an unknown operator.
    #[error("Alert rule '{rule}' uses unknown operator '{op}'")]
    #[diagnostic(code(vitals::config::invalid_alert_op))]
    InvalidAlertOp {
        /// The rule name.
        rule: String,
        /// The rejected operator.
        op: String,
    },

    /// A configured alert rule uses an unknown severity.
    #[error("Alert rule '{rule}' uses unknown severity '{severity}'")]
    #[diagnostic(code(vitals::config::invalid_severity))]
    InvalidSeverity {
        /// The rule name.
        rule: String,
        /// The rejected severity.
        severity: String,
    },

    /// A configured alert rule has an empty name.
    #[error("Alert rules must be named")]
    #[diagnostic(code(vitals::config::unnamed_rule))]
    UnnamedRule,
}
