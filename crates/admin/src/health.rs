// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Health and probe endpoints.
//!
//! - GET `/health` - full health response with per-check results
//! - GET `/livez` - liveness probe
//! - GET `/readyz` - readiness probe

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use vitals_health::{HealthResult, HealthStatus, HealthSummary};

/// All the routes for health and probe endpoints.
pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(show_health))
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
}

#[derive(Serialize)]
struct HealthResponse {
    status: HealthStatus,
    summary: HealthSummary,
    checks: HashMap<String, HealthResult>,
    generated_at: DateTime<Utc>,
}

/// Maps the aggregate status onto the HTTP status contract: healthy and
/// degraded serve 200, unhealthy serves 503, unknown serves 500.
fn http_status(overall: HealthStatus) -> StatusCode {
    match overall {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn show_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let checks = state.runner.snapshot();
    let (overall, summary) = state.runner.aggregate();
    (
        http_status(overall),
        Json(HealthResponse {
            status: overall,
            summary,
            checks,
            generated_at: Utc::now(),
        }),
    )
}

async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

async fn readyz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let (overall, _) = state.runner.aggregate();
    match overall {
        HealthStatus::Healthy | HealthStatus::Degraded => (StatusCode::OK, "OK"),
        HealthStatus::Unhealthy | HealthStatus::Unknown => {
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
    }
}
