// HTTP + WebSocket routes over the shared snapshot and stores

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::alerts::AlertEngine;
use crate::config::AppConfig;
use crate::store::MetricsRepo;
use crate::worker::SnapshotReceiver;

pub use http::{NAME, VERSION};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) snapshots: SnapshotReceiver,
    pub(crate) metrics_repo: Arc<MetricsRepo>,
    pub(crate) engine: Arc<AlertEngine>,
    pub(crate) config: AppConfig,
}

pub fn app(
    snapshots: SnapshotReceiver,
    metrics_repo: Arc<MetricsRepo>,
    engine: Arc<AlertEngine>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        snapshots,
        metrics_repo,
        engine,
        config,
    };
    Router::new()
        .route("/", get(|| async { "Overseer is watching" }))
        .route("/version", get(http::version_handler))
        .route("/api/snapshot", get(http::snapshot_handler))
        .route("/api/metrics/latest", get(http::latest_metrics_handler))
        .route("/api/metrics/history", get(http::metrics_history_handler))
        .route("/api/alerts", get(http::alerts_handler))
        .route(
            "/api/alerts/{id}/acknowledge",
            post(http::acknowledge_handler),
        )
        .route("/api/rules", get(http::rules_handler))
        .route("/api/rules/{name}", axum::routing::put(http::update_rule_handler))
        .route("/api/processes", get(http::processes_handler))
        .route("/api/recommendations", get(http::recommendations_handler))
        .route("/ws/snapshot", get(ws::ws_snapshot))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
