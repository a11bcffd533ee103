// Shared test helpers

#![allow(dead_code)]

use overseer::alerts::{AlertEngine, AlertRuleSet};
use overseer::models::{MetricSample, ProcessInfo, RawMetrics};
use overseer::source::MetricsSource;
use overseer::store::{AlertRepo, MetricsRepo};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub fn raw(cpu: f64, mem: f64) -> RawMetrics {
    RawMetrics {
        cpu_percent: cpu,
        memory_percent: mem,
        memory_used_bytes: 4 << 30,
        memory_total_bytes: 16 << 30,
        disk_percent: 40.0,
        disk_used_bytes: 200 << 30,
        disk_total_bytes: 500 << 30,
        process_count: 120,
        load_average: [0.5, 0.4, 0.3],
        ..Default::default()
    }
}

pub fn sample_at(timestamp: f64, cpu: f64, mem: f64) -> MetricSample {
    MetricSample::from_raw(&raw(cpu, mem), timestamp, None)
}

/// Source that replays queued readings. Once the queue is drained it keeps
/// returning the last successful reading.
pub struct ScriptedSource {
    queue: Mutex<VecDeque<anyhow::Result<RawMetrics>>>,
    last: Mutex<RawMetrics>,
    processes: Vec<ProcessInfo>,
}

impl ScriptedSource {
    pub fn new(readings: Vec<anyhow::Result<RawMetrics>>) -> Self {
        Self {
            queue: Mutex::new(readings.into()),
            last: Mutex::new(raw(10.0, 10.0)),
            processes: vec![
                process(1, "init", 0.1, 0.2),
                process(42, "postgres", 35.0, 12.5),
                process(7, "sshd", 0.0, 0.1),
            ],
        }
    }

    pub fn steady(cpu: f64, mem: f64) -> Self {
        Self::new(vec![Ok(raw(cpu, mem))])
    }

    pub fn with_processes(mut self, processes: Vec<ProcessInfo>) -> Self {
        self.processes = processes;
        self
    }
}

impl MetricsSource for ScriptedSource {
    fn read(&self) -> anyhow::Result<RawMetrics> {
        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(Ok(r)) => {
                *self.last.lock().unwrap() = r.clone();
                Ok(r)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }

    fn processes(&self) -> anyhow::Result<Vec<ProcessInfo>> {
        Ok(self.processes.clone())
    }
}

pub fn process(pid: u32, name: &str, cpu: f64, mem: f64) -> ProcessInfo {
    ProcessInfo {
        pid,
        name: name.into(),
        cpu_percent: cpu,
        memory_percent: mem,
        memory_mb: mem * 100.0,
        status: "Run".into(),
    }
}

/// Metrics and alert stores in a temp directory that lives as long as this value.
pub struct TestStores {
    pub dir: TempDir,
    pub metrics: Arc<MetricsRepo>,
    pub alerts: Arc<AlertRepo>,
}

impl TestStores {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let metrics_path = dir.path().join("metrics.db");
        let alerts_path = dir.path().join("alerts.db");
        let metrics = Arc::new(
            MetricsRepo::connect(metrics_path.to_str().unwrap(), 2)
                .await
                .unwrap(),
        );
        metrics.init().await.unwrap();
        let alerts = Arc::new(
            AlertRepo::connect(alerts_path.to_str().unwrap(), 2)
                .await
                .unwrap(),
        );
        alerts.init().await.unwrap();
        Self {
            dir,
            metrics,
            alerts,
        }
    }

    pub fn engine(&self) -> Arc<AlertEngine> {
        Arc::new(AlertEngine::new(
            AlertRuleSet::with_defaults(),
            self.alerts.clone(),
            300.0,
        ))
    }
}
