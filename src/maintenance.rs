// Background maintenance: prune samples past retention, VACUUM the metrics database.
// Alerts are never pruned.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::models::now_secs;
use crate::store::MetricsRepo;

const SECS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub retention_days: u32,
    pub prune_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

/// When VACUUM runs. A cron expression wins over the fixed interval.
#[derive(Debug)]
pub enum VacuumPlan {
    Cron(Box<cron::Schedule>),
    Every(Duration),
    Off,
}

impl VacuumPlan {
    pub fn from_config(config: &MaintenanceConfig) -> Self {
        match &config.vacuum_schedule {
            Some(expr) => match cron::Schedule::from_str(expr) {
                Ok(schedule) => Self::Cron(Box::new(schedule)),
                Err(e) => {
                    warn!(cron = %expr, error = %e, "invalid vacuum_schedule; VACUUM will not run");
                    Self::Off
                }
            },
            None if config.vacuum_interval_secs > 0 => {
                Self::Every(Duration::from_secs(config.vacuum_interval_secs))
            }
            None => Self::Off,
        }
    }

    /// Time from `now` until the next VACUUM, or None when it never runs.
    pub fn delay_from(&self, now: DateTime<Local>) -> Option<Duration> {
        match self {
            Self::Cron(schedule) => schedule
                .after(&now)
                .next()
                .map(|next| (next - now).to_std().unwrap_or(Duration::from_secs(1))),
            Self::Every(interval) => Some(*interval),
            Self::Off => None,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.delay_from(Local::now()).map(|d| Instant::now() + d)
    }
}

/// Work done by one maintenance worker over its lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceStats {
    pub prunes: u64,
    pub samples_pruned: u64,
    pub vacuums: u64,
}

/// Spawns the maintenance worker. Returns a join handle; exits on shutdown.
pub fn spawn(
    repo: Arc<MetricsRepo>,
    config: MaintenanceConfig,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, config, shutdown).await;
    })
}

/// Prunes on a fixed interval and vacuums per the plan until shutdown turns true.
#[instrument(skip(repo, shutdown), fields(prune_interval_secs = config.prune_interval_secs))]
pub async fn run(
    repo: Arc<MetricsRepo>,
    config: MaintenanceConfig,
    mut shutdown: watch::Receiver<bool>,
) -> MaintenanceStats {
    let mut stats = MaintenanceStats::default();
    let mut prune_interval =
        tokio::time::interval(Duration::from_secs(config.prune_interval_secs.max(1)));
    prune_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let plan = VacuumPlan::from_config(&config);
    let mut next_vacuum = plan.next_deadline();

    loop {
        tokio::select! {
            _ = prune_interval.tick() => {
                stats.prunes += 1;
                match prune_once(&repo, config.retention_days, now_secs()).await {
                    Ok(n) if n > 0 => {
                        stats.samples_pruned += n;
                        info!(samples_pruned = n, "old samples pruned");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, operation = "prune_samples", "prune failed"),
                }
            }
            _ = tokio::time::sleep_until(next_vacuum.unwrap_or_else(Instant::now)), if next_vacuum.is_some() => {
                match repo.vacuum().await {
                    Ok(()) => {
                        stats.vacuums += 1;
                        info!("vacuum complete");
                    }
                    Err(e) => warn!(error = %e, operation = "vacuum", "vacuum failed"),
                }
                next_vacuum = plan.next_deadline();
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!(?stats, "Maintenance worker shutting down");
    stats
}

/// Deletes samples older than `retention_days` relative to `now`.
pub async fn prune_once(repo: &MetricsRepo, retention_days: u32, now: f64) -> anyhow::Result<u64> {
    let cutoff = now - (retention_days as f64) * SECS_PER_DAY;
    repo.prune_before(cutoff).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(schedule: Option<&str>, interval: u64) -> MaintenanceConfig {
        MaintenanceConfig {
            retention_days: 7,
            prune_interval_secs: 3600,
            vacuum_schedule: schedule.map(str::to_string),
            vacuum_interval_secs: interval,
        }
    }

    #[test]
    fn interval_plan_waits_the_interval() {
        let plan = VacuumPlan::from_config(&config(None, 90));
        assert_eq!(plan.delay_from(Local::now()), Some(Duration::from_secs(90)));
    }

    #[test]
    fn cron_plan_waits_until_next_match() {
        let plan = VacuumPlan::from_config(&config(Some("0 0 3 * * *"), 90));
        assert!(matches!(plan, VacuumPlan::Cron(_)));
        let two_am = Local.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).single().unwrap();
        assert_eq!(plan.delay_from(two_am), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn bad_cron_or_zero_interval_disables_vacuum() {
        let plan = VacuumPlan::from_config(&config(Some("not a schedule"), 90));
        assert!(matches!(plan, VacuumPlan::Off));
        assert_eq!(plan.delay_from(Local::now()), None);
        assert!(matches!(VacuumPlan::from_config(&config(None, 0)), VacuumPlan::Off));
    }
}
