// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Alert delivery channels.

use crate::alert::Alert;
use crate::error::Error;
use crate::rule::Severity;
use async_trait::async_trait;

/// A unit of alert delivery with a name.
///
/// Channels are fanned out to concurrently and never awaited for
/// acknowledgement; a failed send is logged and forgotten.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// A short identifier used in logs.
    fn name(&self) -> &str;

    /// Delivers one alert.
    async fn send(&self, alert: &Alert) -> Result<(), Error>;
}

/// Delivers alerts as structured log events, mapping severity to level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alert: &Alert) -> Result<(), Error> {
        match alert.severity {
            Severity::Info => tracing::info!(
                rule = %alert.rule,
                value = alert.value,
                threshold = alert.threshold,
                active = alert.active,
                "{}",
                alert.message
            ),
            Severity::Warning => tracing::warn!(
                rule = %alert.rule,
                value = alert.value,
                threshold = alert.threshold,
                active = alert.active,
                "{}",
                alert.message
            ),
            Severity::Critical => tracing::error!(
                rule = %alert.rule,
                value = alert.value,
                threshold = alert.threshold,
                active = alert.active,
                "{}",
                alert.message
            ),
        }
        Ok(())
    }
}
