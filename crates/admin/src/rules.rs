// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Alert endpoints.
//!
//! - GET `/alerts` - currently active alert instances
//! - GET `/alerts/history?hours=N` - instances first seen within the window
//! - GET `/alerts/rules` - registered alert rules

use crate::AppState;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use vitals_alert::{Alert, AlertRule};

/// Default history window in hours.
const DEFAULT_HISTORY_HOURS: u64 = 24;

/// All the routes for alert endpoints.
pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(active_alerts))
        .route("/alerts/history", get(alert_history))
        .route("/alerts/rules", get(alert_rules))
}

/// Query parameters for `/alerts/history`.
#[derive(Debug, Default, Deserialize)]
struct HistoryQuery {
    /// Window size in hours (default 24).
    #[serde(default)]
    hours: Option<u64>,
}

async fn active_alerts(State(state): State<AppState>) -> Json<Vec<Alert>> {
    Json(state.alerts.active_alerts())
}

async fn alert_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Json<Vec<Alert>> {
    let hours = q.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    Json(state.alerts.history(hours))
}

async fn alert_rules(State(state): State<AppState>) -> Json<Vec<AlertRule>> {
    Json(state.alerts.rules())
}
