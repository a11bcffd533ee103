// Turns a sample into alerts: inclusive threshold checks, dedup window, persistence.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};

use super::AlertRuleSet;
use crate::error::{AckError, RuleError};
use crate::models::{Alert, AlertRule, MetricSample, now_secs};
use crate::store::AlertRepo;

pub const DEFAULT_DEDUP_WINDOW_SECS: f64 = 300.0;

/// Alert emitted by this engine, kept for dedup while the store is unavailable.
struct Emitted {
    alert_type: String,
    value: f64,
    timestamp: f64,
}

pub struct AlertEngine {
    rules: RwLock<AlertRuleSet>,
    repo: Arc<AlertRepo>,
    dedup_window_secs: f64,
    emitted: Mutex<VecDeque<Emitted>>,
}

impl AlertEngine {
    pub fn new(rules: AlertRuleSet, repo: Arc<AlertRepo>, dedup_window_secs: f64) -> Self {
        Self {
            rules: RwLock::new(rules),
            repo,
            dedup_window_secs,
            emitted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn repo(&self) -> &Arc<AlertRepo> {
        &self.repo
    }

    pub fn rules(&self) -> Vec<AlertRule> {
        let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
        rules.rules().to_vec()
    }

    pub fn set_enabled(&self, rule_name: &str, enabled: bool) -> Result<(), RuleError> {
        let mut rules = self.rules.write().unwrap_or_else(|e| e.into_inner());
        rules.set_enabled(rule_name, enabled)?;
        tracing::info!(rule = rule_name, enabled, "alert rule toggled");
        Ok(())
    }

    /// Evaluates every enabled rule against `sample`.
    ///
    /// Rules whose metric is absent on the sample are skipped. A rule fires when
    /// the value is at or above its threshold, unless an alert of the same type
    /// with an equal or higher value was recorded within the dedup window.
    /// Alerts whose insert failed are still returned, with `id == None`.
    pub async fn evaluate(&self, sample: &MetricSample) -> Vec<Alert> {
        let candidates: Vec<AlertRule> = {
            let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
            rules.active_rules().cloned().collect()
        };

        let mut out = Vec::new();
        for rule in candidates {
            let Some(value) = sample.metric(&rule.metric_name) else {
                continue;
            };
            if value.is_nan() || value < rule.threshold {
                continue;
            }
            if self
                .is_duplicate(&rule.rule_name, value, sample.timestamp)
                .await
            {
                debug!(
                    rule = %rule.rule_name,
                    value,
                    "alert suppressed by dedup window"
                );
                continue;
            }

            let mut alert = Alert::triggered(&rule, value, sample.timestamp);
            match self.repo.insert(&alert).await {
                Ok(id) => alert.id = Some(id),
                Err(e) => {
                    warn!(
                        error = %e,
                        operation = "insert_alert",
                        rule = %rule.rule_name,
                        "alert not persisted"
                    );
                }
            }
            self.remember(&alert);
            out.push(alert);
        }
        out
    }

    /// Marks a persisted alert acknowledged by `by`.
    pub async fn acknowledge(&self, id: i64, by: &str) -> Result<Alert, AckError> {
        let alert = self.repo.acknowledge(id, by, now_secs()).await?;
        tracing::info!(alert_id = id, acknowledged_by = by, "alert acknowledged");
        Ok(alert)
    }

    async fn is_duplicate(&self, alert_type: &str, value: f64, now: f64) -> bool {
        let since = now - self.dedup_window_secs;
        {
            let mut emitted = self.emitted.lock().unwrap_or_else(|e| e.into_inner());
            while emitted.front().is_some_and(|e| e.timestamp <= since) {
                emitted.pop_front();
            }
            if emitted
                .iter()
                .any(|e| e.alert_type == alert_type && e.value >= value && e.timestamp > since)
            {
                return true;
            }
        }
        match self
            .repo
            .has_recent_at_or_above(alert_type, value, since)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "dedup_lookup",
                    "alert store unavailable; dedup uses in-memory history only"
                );
                false
            }
        }
    }

    fn remember(&self, alert: &Alert) {
        let mut emitted = self.emitted.lock().unwrap_or_else(|e| e.into_inner());
        emitted.push_back(Emitted {
            alert_type: alert.alert_type.clone(),
            value: alert.metric_value,
            timestamp: alert.timestamp,
        });
    }
}
