// Alert engine: thresholds, dedup window, independent severities, persistence

mod common;

use common::{TestStores, sample_at};
use overseer::alerts::{AlertEngine, AlertRuleSet};
use overseer::error::{AckError, RuleError};
use overseer::models::{AlertRule, Severity};
use std::sync::Arc;

fn cpu_only_engine(stores: &TestStores, threshold: f64) -> AlertEngine {
    let rules = AlertRuleSet::from_rules(vec![AlertRule::new(
        "CPU Critical",
        "cpu_percent",
        threshold,
        Severity::Critical,
        "CPU usage critical",
    )]);
    AlertEngine::new(rules, stores.alerts.clone(), 300.0)
}

#[tokio::test]
async fn threshold_is_inclusive() {
    let stores = TestStores::new().await;
    let engine = cpu_only_engine(&stores, 90.0);

    assert!(engine.evaluate(&sample_at(1000.0, 89.9, 10.0)).await.is_empty());
    let fired = engine.evaluate(&sample_at(1001.0, 90.0, 10.0)).await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].metric_value, 90.0);
    assert_eq!(fired[0].threshold, 90.0);
}

#[tokio::test]
async fn same_value_ten_seconds_apart_fires_once() {
    let stores = TestStores::new().await;
    let engine = cpu_only_engine(&stores, 90.0);

    assert_eq!(engine.evaluate(&sample_at(1000.0, 95.0, 10.0)).await.len(), 1);
    assert!(engine.evaluate(&sample_at(1010.0, 95.0, 10.0)).await.is_empty());
    assert_eq!(stores.alerts.recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn same_value_four_hundred_seconds_apart_fires_twice() {
    let stores = TestStores::new().await;
    let engine = cpu_only_engine(&stores, 90.0);

    assert_eq!(engine.evaluate(&sample_at(1000.0, 95.0, 10.0)).await.len(), 1);
    assert_eq!(engine.evaluate(&sample_at(1400.0, 95.0, 10.0)).await.len(), 1);
    assert_eq!(stores.alerts.recent(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn higher_value_inside_window_is_not_suppressed() {
    let stores = TestStores::new().await;
    let engine = cpu_only_engine(&stores, 90.0);

    assert_eq!(engine.evaluate(&sample_at(1000.0, 92.0, 10.0)).await.len(), 1);
    let fired = engine.evaluate(&sample_at(1010.0, 97.0, 10.0)).await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].metric_value, 97.0);
    // 95 is below the 97 already recorded.
    assert!(engine.evaluate(&sample_at(1020.0, 95.0, 10.0)).await.is_empty());
}

#[tokio::test]
async fn dedup_window_boundary_is_exclusive() {
    let stores = TestStores::new().await;
    let engine = cpu_only_engine(&stores, 90.0);

    assert_eq!(engine.evaluate(&sample_at(1000.0, 95.0, 10.0)).await.len(), 1);
    // Exactly one window later the earlier alert no longer counts.
    assert_eq!(engine.evaluate(&sample_at(1300.0, 95.0, 10.0)).await.len(), 1);
}

#[tokio::test]
async fn severities_fire_independently() {
    let stores = TestStores::new().await;
    let engine = stores.engine();

    let fired = engine.evaluate(&sample_at(1000.0, 92.0, 10.0)).await;
    let mut names: Vec<&str> = fired.iter().map(|a| a.alert_type.as_str()).collect();
    names.sort();
    assert_eq!(names, ["CPU Critical", "CPU Warning"]);
    assert!(fired.iter().all(|a| a.id.is_some()));
}

#[tokio::test]
async fn disabled_rule_never_fires() {
    let stores = TestStores::new().await;
    let engine = stores.engine();
    engine.set_enabled("CPU Warning", false).unwrap();
    engine.set_enabled("CPU Critical", false).unwrap();

    assert!(engine.evaluate(&sample_at(1000.0, 100.0, 10.0)).await.is_empty());

    engine.set_enabled("CPU Critical", true).unwrap();
    let fired = engine.evaluate(&sample_at(1001.0, 100.0, 10.0)).await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].alert_type, "CPU Critical");
}

#[tokio::test]
async fn unknown_rule_is_reported() {
    let stores = TestStores::new().await;
    let engine = stores.engine();
    let err = engine.set_enabled("Swap Critical", false).unwrap_err();
    assert!(matches!(err, RuleError::UnknownRule(ref n) if n == "Swap Critical"));
}

#[tokio::test]
async fn absent_metric_is_skipped() {
    let stores = TestStores::new().await;
    let engine = stores.engine();
    let sample = sample_at(1000.0, 10.0, 10.0);
    assert!(sample.temperature.is_none());
    assert!(engine.evaluate(&sample).await.is_empty());

    let mut hot = sample_at(1001.0, 10.0, 10.0);
    hot.temperature = Some(88.0);
    let names: Vec<String> = engine
        .evaluate(&hot)
        .await
        .into_iter()
        .map(|a| a.alert_type)
        .collect();
    assert!(names.contains(&"Temperature Critical".to_string()));
    assert!(names.contains(&"Temperature Warning".to_string()));
}

#[tokio::test]
async fn cpu_spike_scenario() {
    let stores = TestStores::new().await;
    let engine = stores.engine();

    let first = engine.evaluate(&sample_at(0.0, 92.0, 10.0)).await;
    let critical: Vec<_> = first
        .iter()
        .filter(|a| a.alert_type == "CPU Critical")
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].severity, Severity::Critical);
    assert_eq!(critical[0].metric_value, 92.0);
    assert_eq!(critical[0].threshold, 90.0);
    assert!(critical[0].message.contains("92.0"));

    assert!(engine.evaluate(&sample_at(10.0, 92.0, 10.0)).await.is_empty());

    // Past the 300 s window the same rule fires again.
    let later = engine.evaluate(&sample_at(400.0, 91.0, 10.0)).await;
    let critical: Vec<_> = later
        .iter()
        .filter(|a| a.alert_type == "CPU Critical")
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].metric_value, 91.0);
    assert_eq!(critical[0].timestamp, 400.0);
    assert!(later.iter().any(|a| a.alert_type == "CPU Warning"));

    let stored = stores.alerts.since(-1.0).await.unwrap();
    assert_eq!(
        stored
            .iter()
            .filter(|a| a.alert_type == "CPU Critical")
            .count(),
        2
    );
}

#[tokio::test]
async fn store_failure_returns_unsaved_alert_and_keeps_dedup() {
    let stores = TestStores::new().await;
    let engine = cpu_only_engine(&stores, 90.0);
    stores.alerts.close().await;

    let fired = engine.evaluate(&sample_at(1000.0, 95.0, 10.0)).await;
    assert_eq!(fired.len(), 1);
    assert!(fired[0].id.is_none());
    assert!(!fired[0].is_persisted());

    // In-memory history still suppresses the repeat.
    assert!(engine.evaluate(&sample_at(1010.0, 95.0, 10.0)).await.is_empty());
}

#[tokio::test]
async fn acknowledge_transitions_once() {
    let stores = TestStores::new().await;
    let engine = Arc::new(cpu_only_engine(&stores, 90.0));
    let fired = engine.evaluate(&sample_at(1000.0, 95.0, 10.0)).await;
    let id = fired[0].id.unwrap();
    assert!(!fired[0].acknowledged);

    let acked = engine.acknowledge(id, "oncall").await.unwrap();
    assert!(acked.acknowledged);
    assert_eq!(acked.acknowledged_by.as_deref(), Some("oncall"));
    assert!(acked.acknowledged_at.is_some());

    let again = engine.acknowledge(id, "someone-else").await.unwrap_err();
    assert!(matches!(again, AckError::AlreadyAcknowledged(i) if i == id));
    let stored = stores.alerts.get(id).await.unwrap().unwrap();
    assert_eq!(stored.acknowledged_by.as_deref(), Some("oncall"));

    let missing = engine.acknowledge(id + 100, "oncall").await.unwrap_err();
    assert!(matches!(missing, AckError::NotFound(_)));
}
