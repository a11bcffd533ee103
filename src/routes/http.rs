// REST handlers: snapshot reads, metric history, alert acknowledgement, rule toggles

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::error::{AckError, RuleError};

/// Package version (from Cargo.toml at build time).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml at build time).
pub const NAME: &str = env!("CARGO_PKG_NAME");

const DEFAULT_HISTORY_LIMIT: u32 = 300;
const MAX_HISTORY_LIMIT: u32 = 10_000;
const MAX_ALERTS_LIMIT: u32 = 1_000;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

fn store_error(operation: &str, e: anyhow::Error) -> Response {
    tracing::warn!(error = %e, operation, "store read failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "store unavailable")
}

/// GET /version
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/snapshot
pub(super) async fn snapshot_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshots.borrow().clone();
    Json(snapshot.as_ref().clone())
}

/// GET /api/metrics/latest. 404 until the first tick has completed.
pub(super) async fn latest_metrics_handler(State(state): State<AppState>) -> Response {
    let sample = state.snapshots.borrow().sample.clone();
    match sample {
        Some(sample) => Json(sample).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no sample collected yet"),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    since: Option<f64>,
    limit: Option<u32>,
}

/// GET /api/metrics/history?since=&limit=
///
/// With `since`, samples strictly after it (oldest first); otherwise the most
/// recent `limit` samples, also oldest first.
pub(super) async fn metrics_history_handler(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let limit = q
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let result = match q.since {
        Some(since) => state.metrics_repo.since(since, limit).await,
        None => state.metrics_repo.recent(limit).await,
    };
    match result {
        Ok(samples) => Json(samples).into_response(),
        Err(e) => store_error("metrics_history", e),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AlertsQuery {
    limit: Option<u32>,
}

/// GET /api/alerts?limit=. Newest first.
pub(super) async fn alerts_handler(
    State(state): State<AppState>,
    Query(q): Query<AlertsQuery>,
) -> Response {
    let limit = q
        .limit
        .unwrap_or(state.config.monitoring.recent_alerts)
        .clamp(1, MAX_ALERTS_LIMIT);
    match state.engine.repo().recent(limit).await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => store_error("recent_alerts", e),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AcknowledgeRequest {
    acknowledged_by: String,
}

/// POST /api/alerts/{id}/acknowledge
pub(super) async fn acknowledge_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AcknowledgeRequest>,
) -> Response {
    let by = body.acknowledged_by.trim();
    if by.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "acknowledged_by must be non-empty");
    }
    match state.engine.acknowledge(id, by).await {
        Ok(alert) => Json(alert).into_response(),
        Err(e @ AckError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e @ AckError::AlreadyAcknowledged(_)) => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(AckError::Store(e)) => store_error("acknowledge_alert", e),
    }
}

/// GET /api/rules
pub(super) async fn rules_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.rules())
}

#[derive(Debug, Deserialize)]
pub(super) struct RuleUpdate {
    enabled: bool,
}

/// PUT /api/rules/{name}. Returns the updated rule.
pub(super) async fn update_rule_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<RuleUpdate>,
) -> Response {
    match state.engine.set_enabled(&name, body.enabled) {
        Ok(()) => {
            let rule = state.engine.rules().into_iter().find(|r| r.rule_name == name);
            match rule {
                Some(rule) => Json(rule).into_response(),
                None => error_response(StatusCode::NOT_FOUND, format!("unknown rule: {}", name)),
            }
        }
        Err(e @ RuleError::UnknownRule(_)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

/// GET /api/processes. Top `monitoring.process_limit` processes from the
/// latest snapshot, highest CPU first.
pub(super) async fn processes_handler(State(state): State<AppState>) -> impl IntoResponse {
    let limit = state.config.monitoring.process_limit;
    let processes: Vec<_> = state
        .snapshots
        .borrow()
        .processes
        .iter()
        .take(limit)
        .cloned()
        .collect();
    Json(processes)
}

/// GET /api/recommendations
pub(super) async fn recommendations_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.snapshots.borrow().recommendations.clone())
}
