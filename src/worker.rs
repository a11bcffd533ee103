// Background sampling loop: source -> store -> alert engine -> published snapshot.
// The snapshot is replaced as a whole (watch channel of Arc), so readers never see a mix of ticks.

use crate::alerts::AlertEngine;
use crate::models::{Alert, MetricSample, Snapshot, now_secs};
use crate::recommend::recommend;
use crate::source::MetricsSource;
use crate::store::MetricsRepo;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, interval};
use tracing::{Instrument, debug, info, warn};

pub type SnapshotSender = watch::Sender<Arc<Snapshot>>;
pub type SnapshotReceiver = watch::Receiver<Arc<Snapshot>>;

/// Channel holding the latest snapshot; starts with an empty one.
pub fn snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    watch::channel(Arc::new(Snapshot::default()))
}

/// Source, stores and output channel for the sampler.
pub struct SamplerDeps<S: MetricsSource> {
    pub source: Arc<S>,
    pub metrics_repo: Arc<MetricsRepo>,
    pub engine: Arc<AlertEngine>,
    pub snapshot_tx: SnapshotSender,
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub recent_alerts: u32,
}

/// Outcome of one successful tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub sample: MetricSample,
    pub alerts: Vec<Alert>,
    /// False when the sample write failed; the snapshot was still published.
    pub sample_persisted: bool,
}

pub struct SamplingLoop<S: MetricsSource> {
    source: Arc<S>,
    metrics_repo: Arc<MetricsRepo>,
    engine: Arc<AlertEngine>,
    snapshot_tx: SnapshotSender,
    config: SamplerConfig,
    previous: Option<MetricSample>,
    ticks_ok: u64,
    ticks_failed: u64,
    alerts_emitted: u64,
}

impl<S: MetricsSource> SamplingLoop<S> {
    pub fn new(deps: SamplerDeps<S>, config: SamplerConfig) -> Self {
        let SamplerDeps {
            source,
            metrics_repo,
            engine,
            snapshot_tx,
        } = deps;
        Self {
            source,
            metrics_repo,
            engine,
            snapshot_tx,
            config,
            previous: None,
            ticks_ok: 0,
            ticks_failed: 0,
            alerts_emitted: 0,
        }
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshot_tx.subscribe()
    }

    pub async fn tick(&mut self) -> anyhow::Result<TickReport> {
        self.tick_at(now_secs()).await
    }

    /// One sampling pass stamped with `now` (seconds since epoch).
    ///
    /// A source failure is returned as an error and leaves all state untouched.
    /// Store failures are logged and reported in the [`TickReport`].
    pub async fn tick_at(&mut self, now: f64) -> anyhow::Result<TickReport> {
        let source = self.source.clone();
        let raw = tokio::task::spawn_blocking(move || source.read())
            .await
            .map_err(|e| anyhow::anyhow!("metrics source task join: {}", e))??;

        let sample = MetricSample::from_raw(&raw, now, self.previous.as_ref());

        let sample_persisted = match self.metrics_repo.insert(&sample).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "insert_sample",
                    "sample not persisted"
                );
                false
            }
        };
        self.previous = Some(sample.clone());

        let alerts = self.engine.evaluate(&sample).await;

        // Full list, highest CPU first; row limits apply after each reader's own sort.
        let source = self.source.clone();
        let processes = match tokio::task::spawn_blocking(move || source.processes()).await {
            Ok(Ok(mut p)) => {
                p.sort_by(|a, b| {
                    b.cpu_percent
                        .total_cmp(&a.cpu_percent)
                        .then_with(|| a.pid.cmp(&b.pid))
                });
                p
            }
            Ok(Err(e)) => {
                debug!(error = %e, operation = "processes", "process list unavailable");
                Vec::new()
            }
            Err(e) => {
                debug!(error = %e, operation = "processes", "process list task join failed");
                Vec::new()
            }
        };

        let recent_alerts = self.recent_alerts(&alerts).await;

        let snapshot = Snapshot {
            recommendations: recommend(&sample),
            sample: Some(sample.clone()),
            recent_alerts,
            processes,
            last_update: Some(now),
            store_degraded: !sample_persisted,
        };
        self.snapshot_tx.send_replace(Arc::new(snapshot));

        Ok(TickReport {
            sample,
            alerts,
            sample_persisted,
        })
    }

    /// Recent alerts for the snapshot. Falls back to the previous snapshot plus
    /// this tick's alerts when the alert store cannot be read.
    async fn recent_alerts(&self, new_alerts: &[Alert]) -> Vec<Alert> {
        match self.engine.repo().recent(self.config.recent_alerts).await {
            Ok(a) => a,
            Err(e) => {
                debug!(error = %e, operation = "recent_alerts", "alert store read failed");
                let previous = self.snapshot_tx.borrow().recent_alerts.clone();
                let mut merged: Vec<Alert> = new_alerts.iter().rev().cloned().collect();
                merged.extend(previous);
                merged.truncate(self.config.recent_alerts as usize);
                merged
            }
        }
    }

    /// Ticks every `period` until `shutdown` turns true. A tick in progress is
    /// always finished before the loop exits; a failed tick never ends the loop.
    pub async fn run(
        mut self,
        period: Duration,
        stats_log_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        stats_log_tick.tick().await;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tick.tick() => {
                    match self.tick().await {
                        Ok(report) => {
                            self.ticks_ok += 1;
                            self.alerts_emitted += report.alerts.len() as u64;
                            for alert in &report.alerts {
                                info!(
                                    alert_type = %alert.alert_type,
                                    severity = %alert.severity,
                                    metric_value = alert.metric_value,
                                    persisted = alert.is_persisted(),
                                    "alert raised"
                                );
                            }
                        }
                        Err(e) => {
                            self.ticks_failed += 1;
                            warn!(
                                error = %e,
                                operation = "sample_tick",
                                "metrics read failed; skipping tick"
                            );
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = stats_log_tick.tick() => {
                    info!(
                        ticks_ok = self.ticks_ok,
                        ticks_failed = self.ticks_failed,
                        alerts_emitted = self.alerts_emitted,
                        "sampler stats"
                    );
                }
            }
        }
        debug!("Sampling loop shutting down");
    }
}

/// Spawns the sampling loop on the runtime.
pub fn spawn<S: MetricsSource>(
    sampler: SamplingLoop<S>,
    period: Duration,
    stats_log_interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let span = tracing::span!(
        tracing::Level::DEBUG,
        "sampler",
        period_ms = period.as_millis() as u64
    );
    tokio::spawn(
        sampler
            .run(period, stats_log_interval, shutdown)
            .instrument(span),
    )
}
