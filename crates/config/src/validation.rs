// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Start-time validation of monitoring settings.

use crate::error::Error;
use crate::{AlertRuleSettings, MonitoringSettings};
use std::net::SocketAddr;
use std::path::Component;

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error", "fatal"];
const ALERT_OPS: &[&str] = &["gt", "gte", "lt", "lte", "eq", "ne", "exists"];
const SEVERITIES: &[&str] = &["info", "warning", "critical"];

/// Validates the settings the core received; the first violation is fatal.
pub fn validate(settings: &MonitoringSettings) -> Result<(), Error> {
    if !LOG_LEVELS.contains(&settings.log_level.as_str()) {
        return Err(Error::InvalidLogLevel {
            level: settings.log_level.clone(),
        });
    }

    if let Some(path) = &settings.metrics.output_path {
        let escapes = path
            .components()
            .any(|component| component == Component::ParentDir);
        if escapes {
            return Err(Error::UnsafeOutputPath {
                path: path.display().to_string(),
            });
        }
    }

    if settings.metrics.flush_interval.is_zero() {
        return Err(Error::ZeroInterval {
            field: "metrics.flush_interval",
        });
    }
    if settings.health.check_interval.is_zero() {
        return Err(Error::ZeroInterval {
            field: "health.check_interval",
        });
    }
    if settings.alerting.evaluation_interval.is_zero() {
        return Err(Error::ZeroInterval {
            field: "alerting.evaluation_interval",
        });
    }

    if settings.admin.enabled {
        let addr: SocketAddr =
            settings
                .admin
                .bind_address
                .parse()
                .map_err(|e: std::net::AddrParseError| Error::InvalidBindAddress {
                    bind_address: settings.admin.bind_address.clone(),
                    details: e.to_string(),
                })?;
        if addr.port() == 0 {
            return Err(Error::InvalidPort {
                port: u32::from(addr.port()),
            });
        }
    }

    let sample_rate = settings.performance.sample_rate;
    if !(0.0..=1.0).contains(&sample_rate) || sample_rate.is_nan() {
        return Err(Error::InvalidSampleRate { value: sample_rate });
    }

    let error_rate = settings.alerting.thresholds.error_rate;
    if !(0.0..=1.0).contains(&error_rate) || error_rate.is_nan() {
        return Err(Error::InvalidErrorRate { value: error_rate });
    }

    for rule in &settings.alerting.rules {
        validate_rule(rule)?;
    }
    Ok(())
}

fn validate_rule(rule: &AlertRuleSettings) -> Result<(), Error> {
    if rule.name.is_empty() {
        return Err(Error::UnnamedRule);
    }
    if !ALERT_OPS.contains(&rule.op.as_str()) {
        return Err(Error::InvalidAlertOp {
            rule: rule.name.clone(),
            op: rule.op.clone(),
        });
    }
    if !SEVERITIES.contains(&rule.severity.as_str()) {
        return Err(Error::InvalidSeverity {
            rule: rule.name.clone(),
            severity: rule.severity.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_rule() -> AlertRuleSettings {
        AlertRuleSettings {
            name: "cpu_high".into(),
            metric: "cpu_usage".into(),
            labels: Default::default(),
            op: "gt".into(),
            threshold: 80.0,
            severity: "warning".into(),
            message: "cpu above threshold".into(),
            cooldown: None,
            enabled: true,
        }
    }

    #[test]
    fn defaults_validate() {
        validate(&MonitoringSettings::default()).expect("defaults are valid");
    }

    #[test]
    fn unknown_log_level_is_fatal() {
        let mut settings = MonitoringSettings::default();
        settings.log_level = "verbose".into();
        assert!(matches!(
            validate(&settings),
            Err(Error::InvalidLogLevel { .. })
        ));
    }

    #[test]
    fn parent_dir_components_are_rejected() {
        let mut settings = MonitoringSettings::default();
        settings.metrics.output_path = Some(PathBuf::from("data/../../etc/metrics.json"));
        assert!(matches!(
            validate(&settings),
            Err(Error::UnsafeOutputPath { .. })
        ));
    }

    #[test]
    fn port_zero_is_rejected_when_admin_enabled() {
        let mut settings = MonitoringSettings::default();
        settings.admin.enabled = true;
        settings.admin.bind_address = "127.0.0.1:0".into();
        assert!(matches!(validate(&settings), Err(Error::InvalidPort { .. })));

        settings.admin.bind_address = "not-an-address".into();
        assert!(matches!(
            validate(&settings),
            Err(Error::InvalidBindAddress { .. })
        ));
    }

    #[test]
    fn sample_rate_outside_unit_interval_is_rejected() {
        let mut settings = MonitoringSettings::default();
        settings.performance.sample_rate = 1.5;
        assert!(matches!(
            validate(&settings),
            Err(Error::InvalidSampleRate { .. })
        ));
    }

    #[test]
    fn error_rate_outside_unit_interval_is_rejected() {
        let mut settings = MonitoringSettings::default();
        settings.alerting.thresholds.error_rate = -0.1;
        assert!(matches!(
            validate(&settings),
            Err(Error::InvalidErrorRate { .. })
        ));
    }

    #[test]
    fn zero_flush_interval_is_rejected() {
        let mut settings = MonitoringSettings::default();
        settings.metrics.flush_interval = std::time::Duration::ZERO;
        assert!(matches!(
            validate(&settings),
            Err(Error::ZeroInterval { .. })
        ));
    }

    #[test]
    fn rules_with_bad_operators_are_rejected() {
        let mut settings = MonitoringSettings::default();
        let mut rule = valid_rule();
        rule.op = "above".into();
        settings.alerting.rules.push(rule);
        assert!(matches!(
            validate(&settings),
            Err(Error::InvalidAlertOp { .. })
        ));

        let mut settings = MonitoringSettings::default();
        let mut rule = valid_rule();
        rule.severity = "panic".into();
        settings.alerting.rules.push(rule);
        assert!(matches!(
            validate(&settings),
            Err(Error::InvalidSeverity { .. })
        ));

        let mut settings = MonitoringSettings::default();
        settings.alerting.rules.push(valid_rule());
        validate(&settings).expect("a well-formed rule validates");
    }
}
