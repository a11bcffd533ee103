// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum_test::TestServer;
use common::{ScriptedSource, TestStores};
use overseer::config::AppConfig;
use overseer::models::{Alert, AlertRule, MetricSample, Snapshot};
use overseer::routes;
use overseer::worker::{SamplerConfig, SamplerDeps, SamplingLoop, snapshot_channel};
use std::sync::Arc;

struct Harness {
    stores: TestStores,
    sampler: SamplingLoop<ScriptedSource>,
    server: TestServer,
}

async fn harness(cpu: f64) -> Harness {
    harness_with(cpu, false).await
}

async fn harness_with(cpu: f64, http_transport: bool) -> Harness {
    harness_config(cpu, http_transport, AppConfig::default()).await
}

async fn harness_config(cpu: f64, http_transport: bool, config: AppConfig) -> Harness {
    let stores = TestStores::new().await;
    let engine = stores.engine();
    let (snapshot_tx, snapshot_rx) = snapshot_channel();
    let sampler = SamplingLoop::new(
        SamplerDeps {
            source: Arc::new(ScriptedSource::steady(cpu, 20.0)),
            metrics_repo: stores.metrics.clone(),
            engine: engine.clone(),
            snapshot_tx,
        },
        SamplerConfig {
            recent_alerts: 20,
        },
    );
    let app = routes::app(
        snapshot_rx,
        stores.metrics.clone(),
        engine,
        config,
    );
    let server = if http_transport {
        TestServer::builder().http_transport().build(app)
    } else {
        TestServer::new(app)
    };
    Harness {
        stores,
        sampler,
        server,
    }
}

#[tokio::test]
async fn root_and_version() {
    let h = harness(10.0).await;
    let response = h.server.get("/").await;
    response.assert_status_ok();
    response.assert_text("Overseer is watching");

    let json: serde_json::Value = h.server.get("/version").await.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("overseer"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn latest_metrics_is_404_before_first_tick() {
    let mut h = harness(10.0).await;
    h.server
        .get("/api/metrics/latest")
        .await
        .assert_status_not_found();

    h.sampler.tick_at(1000.0).await.unwrap();
    let response = h.server.get("/api/metrics/latest").await;
    response.assert_status_ok();
    let sample: MetricSample = response.json();
    assert_eq!(sample.timestamp, 1000.0);
    assert_eq!(sample.cpu_percent, 10.0);
}

#[tokio::test]
async fn snapshot_processes_and_recommendations() {
    let mut h = harness(92.0).await;
    h.sampler.tick_at(1000.0).await.unwrap();

    let snap: Snapshot = h.server.get("/api/snapshot").await.json();
    assert_eq!(snap.last_update, Some(1000.0));
    assert_eq!(snap.recent_alerts.len(), 2);

    let procs: Vec<serde_json::Value> = h.server.get("/api/processes").await.json();
    assert_eq!(procs.len(), 3);
    assert_eq!(procs[0]["name"], "postgres");

    let recs: Vec<serde_json::Value> = h.server.get("/api/recommendations").await.json();
    assert_eq!(recs[0]["category"], "cpu");
}

#[tokio::test]
async fn processes_endpoint_keeps_top_rows_by_cpu() {
    let mut config = AppConfig::default();
    config.monitoring.process_limit = 2;
    let mut h = harness_config(10.0, false, config).await;
    h.sampler.tick_at(1000.0).await.unwrap();

    let procs: Vec<serde_json::Value> = h.server.get("/api/processes").await.json();
    let names: Vec<&str> = procs.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(names, ["postgres", "init"]);

    // The snapshot itself keeps every process.
    let snap: Snapshot = h.server.get("/api/snapshot").await.json();
    assert_eq!(snap.processes.len(), 3);
}

#[tokio::test]
async fn metrics_history_since_and_limit() {
    let mut h = harness(10.0).await;
    for i in 0..4 {
        h.sampler.tick_at(1000.0 + i as f64 * 2.0).await.unwrap();
    }
    let all: Vec<MetricSample> = h.server.get("/api/metrics/history").await.json();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let recent: Vec<MetricSample> = h
        .server
        .get("/api/metrics/history")
        .add_query_param("since", 1002.0)
        .add_query_param("limit", 1)
        .await
        .json();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].timestamp, 1004.0);
}

#[tokio::test]
async fn acknowledge_alert_over_http() {
    let mut h = harness(95.0).await;
    let report = h.sampler.tick_at(1000.0).await.unwrap();
    let id = report.alerts[0].id.unwrap();

    let alerts: Vec<Alert> = h.server.get("/api/alerts").await.json();
    assert_eq!(alerts.len(), 2);

    let response = h
        .server
        .post(&format!("/api/alerts/{id}/acknowledge"))
        .json(&serde_json::json!({ "acknowledged_by": "oncall" }))
        .await;
    response.assert_status_ok();
    let acked: Alert = response.json();
    assert!(acked.acknowledged);
    assert_eq!(acked.acknowledged_by.as_deref(), Some("oncall"));

    h.server
        .post(&format!("/api/alerts/{id}/acknowledge"))
        .json(&serde_json::json!({ "acknowledged_by": "oncall" }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);

    h.server
        .post("/api/alerts/9999/acknowledge")
        .json(&serde_json::json!({ "acknowledged_by": "oncall" }))
        .await
        .assert_status_not_found();

    h.server
        .post(&format!("/api/alerts/{id}/acknowledge"))
        .json(&serde_json::json!({ "acknowledged_by": "  " }))
        .await
        .assert_status_bad_request();

    let stored = h.stores.alerts.get(id).await.unwrap().unwrap();
    assert!(stored.acknowledged);
}

#[tokio::test]
async fn toggling_rules_changes_evaluation() {
    let mut h = harness(95.0).await;
    let rules: Vec<AlertRule> = h.server.get("/api/rules").await.json();
    assert_eq!(rules.len(), 8);

    for name in ["CPU%20Warning", "CPU%20Critical"] {
        let response = h
            .server
            .put(&format!("/api/rules/{name}"))
            .json(&serde_json::json!({ "enabled": false }))
            .await;
        response.assert_status_ok();
        let rule: AlertRule = response.json();
        assert!(!rule.enabled);
    }
    let report = h.sampler.tick_at(1000.0).await.unwrap();
    assert!(report.alerts.is_empty());

    h.server
        .put("/api/rules/Fan%20Warning")
        .json(&serde_json::json!({ "enabled": false }))
        .await
        .assert_status_not_found();
}

// Server may send Ping frames between snapshots.
async fn receive_json_text<T: serde::de::DeserializeOwned>(ws: &mut axum_test::TestWebSocket) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn ws_snapshot_pushes_current_then_updates() {
    let mut h = harness_with(10.0, true).await;
    let mut ws = h
        .server
        .get_websocket("/ws/snapshot")
        .await
        .into_websocket()
        .await;

    let first: Snapshot = receive_json_text(&mut ws).await;
    assert!(first.sample.is_none());

    h.sampler.tick_at(1000.0).await.unwrap();
    let next: Snapshot = receive_json_text(&mut ws).await;
    assert_eq!(next.last_update, Some(1000.0));
    assert_eq!(next.sample.map(|s| s.cpu_percent), Some(10.0));
}
