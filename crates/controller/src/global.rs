// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Optional module-level accessor.
//!
//! The monitor is a value type wired in by the host; for call sites where
//! threading the handle is impractical, the host may install it here once.
//! Accessors never return null-like handles: before installation they hand
//! out a permanently disabled monitor whose store drops every write.

use crate::Monitor;
use std::sync::OnceLock;
use vitals_config::MonitoringSettings;
use vitals_telemetry::MetricStore;

static INSTALLED: OnceLock<Monitor> = OnceLock::new();
static NOOP: OnceLock<Monitor> = OnceLock::new();

/// Installs the process-wide monitor. Returns `false` when one was already
/// installed (the original stays in place).
pub fn install(monitor: Monitor) -> bool {
    INSTALLED.set(monitor).is_ok()
}

/// The installed monitor, or a permanently disabled one when none is set.
#[must_use]
pub fn monitor() -> Monitor {
    if let Some(installed) = INSTALLED.get() {
        return installed.clone();
    }
    NOOP.get_or_init(|| {
        Monitor::new(MonitoringSettings {
            enabled: false,
            ..MonitoringSettings::default()
        })
        .expect("disabled default settings are valid")
    })
    .clone()
}

/// The installed monitor's metric store, or a write-discarding one.
#[must_use]
pub fn metrics() -> MetricStore {
    monitor().metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninstalled_accessor_returns_a_disabled_store() {
        // Note: relies on no other test in this binary installing a monitor.
        let store = metrics();
        assert!(!store.is_enabled());
        store.counter("ignored", vitals_telemetry::LabelSet::empty());
        assert!(store.gather().is_empty());
    }
}
