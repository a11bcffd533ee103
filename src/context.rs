// Explicitly constructed application context: config, stores, engine, channels.
// Owned by main; components receive clones of what they need.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::alerts::AlertEngine;
use crate::config::AppConfig;
use crate::maintenance::{self, MaintenanceConfig};
use crate::source::MetricsSource;
use crate::store::{AlertRepo, MetricsRepo};
use crate::worker::{self, SamplerConfig, SamplerDeps, SamplingLoop, SnapshotReceiver, SnapshotSender};

pub struct AppContext {
    pub config: AppConfig,
    pub metrics_repo: Arc<MetricsRepo>,
    pub engine: Arc<AlertEngine>,
    snapshot_tx: SnapshotSender,
    shutdown_tx: watch::Sender<bool>,
}

impl AppContext {
    /// Opens both stores, creates their schemas and builds the alert engine
    /// from the configured rule overrides.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let db = &config.database;
        let metrics_repo = Arc::new(MetricsRepo::connect(&db.metrics_path, db.max_pool_size).await?);
        metrics_repo.init().await?;
        let alert_repo = Arc::new(AlertRepo::connect(&db.alerts_path, db.max_pool_size).await?);
        alert_repo.init().await?;

        let engine = Arc::new(AlertEngine::new(
            config.rule_set()?,
            alert_repo,
            config.alerts.dedup_window_secs,
        ));
        let (snapshot_tx, _) = worker::snapshot_channel();
        let (shutdown_tx, _) = watch::channel(false);
        tracing::debug!(
            metrics_path = %db.metrics_path,
            alerts_path = %db.alerts_path,
            "stores opened"
        );
        Ok(Self {
            config,
            metrics_repo,
            engine,
            snapshot_tx,
            shutdown_tx,
        })
    }

    pub fn snapshots(&self) -> SnapshotReceiver {
        self.snapshot_tx.subscribe()
    }

    pub fn shutdown_sender(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Asks every background task to stop after its current unit of work.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn sampler<S: MetricsSource>(&self, source: Arc<S>) -> SamplingLoop<S> {
        SamplingLoop::new(
            SamplerDeps {
                source,
                metrics_repo: self.metrics_repo.clone(),
                engine: self.engine.clone(),
                snapshot_tx: self.snapshot_tx.clone(),
            },
            SamplerConfig {
                recent_alerts: self.config.monitoring.recent_alerts,
            },
        )
    }

    /// Starts the sampling loop and the maintenance worker.
    pub fn spawn_background<S: MetricsSource>(&self, source: Arc<S>) -> Vec<JoinHandle<()>> {
        let monitoring = &self.config.monitoring;
        let db = &self.config.database;
        let sampler = worker::spawn(
            self.sampler(source),
            Duration::from_secs(monitoring.sample_interval_secs),
            Duration::from_secs(monitoring.stats_log_interval_secs),
            self.shutdown_receiver(),
        );
        let maintenance = maintenance::spawn(
            self.metrics_repo.clone(),
            MaintenanceConfig {
                retention_days: db.retention_days,
                prune_interval_secs: db.prune_interval_secs,
                vacuum_schedule: db.vacuum_schedule.clone(),
                vacuum_interval_secs: db.vacuum_interval_secs,
            },
            self.shutdown_receiver(),
        );
        vec![sampler, maintenance]
    }

    pub fn router(&self) -> axum::Router {
        crate::routes::app(
            self.snapshots(),
            self.metrics_repo.clone(),
            self.engine.clone(),
            self.config.clone(),
        )
    }

    pub async fn close(&self) {
        self.metrics_repo.close().await;
        self.engine.repo().close().await;
    }
}
