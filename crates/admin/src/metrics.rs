// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Metrics endpoint.
//!
//! - GET `/metrics` - current samples as `{ timestamp, metrics }`

use crate::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vitals_telemetry::Sample;

/// All the routes for metric endpoints.
pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(show_metrics))
}

#[derive(Serialize)]
struct MetricsResponse {
    timestamp: DateTime<Utc>,
    metrics: Vec<Sample>,
}

async fn show_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        timestamp: Utc::now(),
        metrics: state.store.gather(),
    })
}
