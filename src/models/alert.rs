// Alert rules, severities and alert records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(anyhow::anyhow!("unknown severity '{}'", other)),
        }
    }
}

/// A named threshold policy on one sample field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub rule_name: String,
    pub metric_name: String,
    pub threshold: f64,
    pub severity: Severity,
    pub enabled: bool,
    pub description: String,
}

impl AlertRule {
    pub fn new(
        rule_name: &str,
        metric_name: &str,
        threshold: f64,
        severity: Severity,
        description: &str,
    ) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            metric_name: metric_name.to_string(),
            threshold,
            severity,
            enabled: true,
            description: description.to_string(),
        }
    }
}

/// One detected threshold violation.
///
/// `id` is assigned by the alert store on insert; an alert whose insert
/// failed keeps `id == None`. Only the acknowledgement fields ever change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Option<i64>,
    pub timestamp: f64,
    pub alert_type: String,
    pub metric_name: String,
    pub metric_value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub message: String,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<f64>,
}

impl Alert {
    /// Builds an unsaved alert for `rule` triggered by `value` at `timestamp`.
    pub fn triggered(rule: &AlertRule, value: f64, timestamp: f64) -> Self {
        Self {
            id: None,
            timestamp,
            alert_type: rule.rule_name.clone(),
            metric_name: rule.metric_name.clone(),
            metric_value: value,
            threshold: rule.threshold,
            severity: rule.severity,
            message: format!(
                "{}: {} is {:.1} (threshold {:.1})",
                rule.rule_name, rule.metric_name, value, rule.threshold
            ),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_round_trips_through_str() {
        for s in [Severity::Info, Severity::Warning, Severity::Critical] {
            assert_eq!(s.as_str().parse::<Severity>().unwrap(), s);
        }
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn triggered_alert_is_unsaved_and_unacknowledged() {
        let rule = AlertRule::new("CPU Critical", "cpu_percent", 90.0, Severity::Critical, "");
        let alert = Alert::triggered(&rule, 92.0, 10.0);
        assert!(!alert.is_persisted());
        assert!(!alert.acknowledged);
        assert_eq!(alert.alert_type, "CPU Critical");
        assert!(alert.message.contains("92.0"));
    }
}
