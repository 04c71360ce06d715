// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! HTTP server for exposing the core's health, metrics, and alert endpoints.

pub mod error;
mod health;
mod metrics;
mod rules;

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use vitals_alert::AlertEngine;
use vitals_config::AdminSettings;
use vitals_health::HealthRunner;
use vitals_telemetry::MetricStore;

/// Shared state for the HTTP admin server.
#[derive(Debug, Clone)]
struct AppState {
    /// The metric store for snapshot queries.
    store: MetricStore,
    /// The health runner for status queries.
    runner: Arc<HealthRunner>,
    /// The alert engine for active alerts, history, and rules.
    alerts: Arc<AlertEngine>,
}

/// Builds the admin router; exposed separately so handlers can be exercised
/// without binding a socket.
fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(metrics::routes())
        .merge(rules::routes())
        .with_state(state)
}

/// Run the admin HTTP server until shutdown is requested.
pub async fn run(
    config: AdminSettings,
    store: MetricStore,
    runner: Arc<HealthRunner>,
    alerts: Arc<AlertEngine>,
    cancel: CancellationToken,
) -> Result<(), Error> {
    let app = router(AppState {
        store,
        runner,
        alerts,
    });

    let addr = config
        .bind_address
        .parse::<SocketAddr>()
        .map_err(|e| Error::InvalidBindAddress {
            bind_address: config.bind_address.clone(),
            details: e.to_string(),
        })?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::BindFailed {
            addr: addr.to_string(),
            details: e.to_string(),
        })?;

    tracing::info!(endpoint = %addr, "admin HTTP server listening");
    tracing::debug!(route = "/health", method = "GET", "overall health endpoint");
    tracing::debug!(route = "/metrics", method = "GET", "metrics snapshot endpoint");
    tracing::debug!(route = "/alerts", method = "GET", "active alerts endpoint");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await
        .map_err(|e| Error::ServerError {
            addr: addr.to_string(),
            details: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use vitals_alert::{AlertOp, AlertRule, Severity};
    use vitals_health::{CheckOutcome, HealthCheck, HealthStatus};
    use vitals_telemetry::{LabelSet, MetricKind, Sample, StoreOptions};

    struct Fixed {
        name: &'static str,
        status: HealthStatus,
        critical: bool,
    }

    #[async_trait]
    impl HealthCheck for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn critical(&self) -> bool {
            self.critical
        }
        async fn check(&self) -> CheckOutcome {
            CheckOutcome::with_status(self.status, "fixed")
        }
    }

    async fn state_with(status: HealthStatus, critical: bool) -> AppState {
        let store = MetricStore::new(StoreOptions::default()).expect("valid options");
        let runner = Arc::new(HealthRunner::default());
        runner
            .register(Arc::new(Fixed {
                name: "probe",
                status,
                critical,
            }))
            .expect("register");
        runner
            .run_once(&CancellationToken::new())
            .await;
        AppState {
            store,
            runner,
            alerts: Arc::new(AlertEngine::default()),
        }
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router(state)
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn healthy_maps_to_200() {
        let state = state_with(HealthStatus::Healthy, false).await;
        let (status, body) = get(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["summary"]["total"], 1);
    }

    #[tokio::test]
    async fn critical_unhealthy_maps_to_503() {
        let state = state_with(HealthStatus::Unhealthy, true).await;
        let (status, body) = get(state, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["checks"]["probe"]["critical"], true);
    }

    #[tokio::test]
    async fn degraded_is_ready() {
        let state = state_with(HealthStatus::Degraded, false).await;
        let (status, _) = get(state.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get(state, "/livez").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unhealthy_critical_is_not_ready_but_live() {
        let state = state_with(HealthStatus::Unhealthy, true).await;
        let (status, _) = get(state.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = get(state, "/livez").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_returns_the_snapshot() {
        let state = state_with(HealthStatus::Healthy, false).await;
        state.store.counter("req", LabelSet::from([("m", "GET")]));
        let (status, body) = get(state, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["timestamp"].is_string());
        let metrics = body["metrics"].as_array().expect("metrics array");
        assert!(metrics.iter().any(|m| m["name"] == "req"));
    }

    #[tokio::test]
    async fn alerts_surface_active_history_and_rules() {
        let state = state_with(HealthStatus::Healthy, false).await;
        state
            .alerts
            .register_rule(AlertRule::new(
                "cpu_high",
                "cpu_usage",
                AlertOp::Gt,
                80.0,
                Severity::Warning,
                "cpu above threshold",
            ))
            .expect("rule registers");
        state.alerts.evaluate(&[Sample::new(
            "cpu_usage",
            MetricKind::Gauge,
            95.0,
            LabelSet::empty(),
            chrono::Utc::now(),
        )]);

        let (status, body) = get(state.clone(), "/alerts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().expect("array").len(), 1);
        assert_eq!(body[0]["rule"], "cpu_high");

        let (_, history) = get(state.clone(), "/alerts/history?hours=48").await;
        assert_eq!(history.as_array().expect("array").len(), 1);

        let (_, rules) = get(state, "/alerts/rules").await;
        assert_eq!(rules.as_array().expect("array").len(), 1);
        assert_eq!(rules[0]["name"], "cpu_high");
    }
}
