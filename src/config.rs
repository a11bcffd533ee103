use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::alerts::{AlertRuleSet, DEFAULT_DEDUP_WINDOW_SECS};
use crate::dashboard::View;

pub const DEFAULT_CONFIG_FILE: &str = "overseer.toml";
pub const MIN_REFRESH_SECS: u64 = 1;
pub const MAX_REFRESH_SECS: u64 = 10;
pub const DEFAULT_PROCESS_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
    pub alerts: AlertsConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8765,
            host: "127.0.0.1".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub metrics_path: String,
    pub alerts_path: String,
    pub max_pool_size: u32,
    pub retention_days: u32,
    /// How often old samples are pruned (real seconds).
    pub prune_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            metrics_path: "data/metrics.db".into(),
            alerts_path: "data/alerts.db".into(),
            max_pool_size: 4,
            retention_days: 7,
            prune_interval_secs: 3600,
            vacuum_schedule: None,
            vacuum_interval_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub sample_interval_secs: u64,
    /// Rows shown in the processes view and by /api/processes, applied after sorting.
    pub process_limit: usize,
    /// Alerts kept in each snapshot.
    pub recent_alerts: u32,
    /// How often to log loop stats (ticks, failures, alerts) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 2,
            process_limit: DEFAULT_PROCESS_LIMIT,
            recent_alerts: 50,
            stats_log_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub dedup_window_secs: f64,
    /// Rule names disabled at startup.
    pub disabled: Vec<String>,
    /// Threshold overrides keyed by rule name.
    pub thresholds: BTreeMap<String, f64>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: DEFAULT_DEDUP_WINDOW_SECS,
            disabled: Vec::new(),
            thresholds: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub refresh_rate: u64,
    pub default_view: View,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_rate: 2,
            default_view: View::Overview,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file used while the dashboard owns the terminal.
    pub dashboard_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dashboard_log: "data/overseer.log".into(),
        }
    }
}

impl AppConfig {
    /// Loads `path` if given, else `$OVERSEER_CONFIG`, else `overseer.toml`.
    /// A missing default file yields built-in defaults; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var("OVERSEER_CONFIG") {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };
        if !explicit && !path.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Default rules with the configured overrides applied.
    pub fn rule_set(&self) -> anyhow::Result<AlertRuleSet> {
        let mut rules = AlertRuleSet::with_defaults();
        for (name, threshold) in &self.alerts.thresholds {
            rules
                .set_threshold(name, *threshold)
                .map_err(|e| anyhow::anyhow!("alerts.thresholds: {}", e))?;
        }
        for name in &self.alerts.disabled {
            rules
                .set_enabled(name, false)
                .map_err(|e| anyhow::anyhow!("alerts.disabled: {}", e))?;
        }
        Ok(rules)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.metrics_path.is_empty(),
            "database.metrics_path must be non-empty"
        );
        anyhow::ensure!(
            !self.database.alerts_path.is_empty(),
            "database.alerts_path must be non-empty"
        );
        anyhow::ensure!(
            self.database.metrics_path != self.database.alerts_path,
            "database.metrics_path and database.alerts_path must differ"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.prune_interval_secs > 0,
            "database.prune_interval_secs must be > 0, got {}",
            self.database.prune_interval_secs
        );
        anyhow::ensure!(
            self.database.vacuum_interval_secs > 0,
            "database.vacuum_interval_secs must be > 0, got {}",
            self.database.vacuum_interval_secs
        );
        if let Some(schedule) = &self.database.vacuum_schedule {
            cron::Schedule::from_str(schedule).map_err(|e| {
                anyhow::anyhow!("database.vacuum_schedule '{}' is invalid: {}", schedule, e)
            })?;
        }
        anyhow::ensure!(
            (MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&self.monitoring.sample_interval_secs),
            "monitoring.sample_interval_secs must be between {} and {}, got {}",
            MIN_REFRESH_SECS,
            MAX_REFRESH_SECS,
            self.monitoring.sample_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.process_limit > 0,
            "monitoring.process_limit must be > 0, got {}",
            self.monitoring.process_limit
        );
        anyhow::ensure!(
            self.monitoring.recent_alerts > 0,
            "monitoring.recent_alerts must be > 0, got {}",
            self.monitoring.recent_alerts
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.alerts.dedup_window_secs >= 0.0,
            "alerts.dedup_window_secs must be >= 0, got {}",
            self.alerts.dedup_window_secs
        );
        anyhow::ensure!(
            (MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&self.dashboard.refresh_rate),
            "dashboard.refresh_rate must be between {} and {}, got {}",
            MIN_REFRESH_SECS,
            MAX_REFRESH_SECS,
            self.dashboard.refresh_rate
        );
        self.rule_set()?;
        Ok(())
    }
}
