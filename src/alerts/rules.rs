// Threshold policy: named rules, each watching one sample field.

use crate::error::RuleError;
use crate::models::{AlertRule, Severity};

#[derive(Debug, Clone)]
pub struct AlertRuleSet {
    rules: Vec<AlertRule>,
}

impl Default for AlertRuleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AlertRuleSet {
    /// A warning and a critical rule for CPU, memory, disk and temperature.
    /// Critical thresholds sit strictly above the warning ones.
    pub fn with_defaults() -> Self {
        Self {
            rules: vec![
                AlertRule::new(
                    "CPU Warning",
                    "cpu_percent",
                    70.0,
                    Severity::Warning,
                    "CPU usage is high",
                ),
                AlertRule::new(
                    "CPU Critical",
                    "cpu_percent",
                    90.0,
                    Severity::Critical,
                    "CPU usage is critically high",
                ),
                AlertRule::new(
                    "Memory Warning",
                    "memory_percent",
                    80.0,
                    Severity::Warning,
                    "Memory usage is high",
                ),
                AlertRule::new(
                    "Memory Critical",
                    "memory_percent",
                    95.0,
                    Severity::Critical,
                    "Memory usage is critically high",
                ),
                AlertRule::new(
                    "Disk Warning",
                    "disk_percent",
                    85.0,
                    Severity::Warning,
                    "Disk is filling up",
                ),
                AlertRule::new(
                    "Disk Critical",
                    "disk_percent",
                    95.0,
                    Severity::Critical,
                    "Disk is nearly full",
                ),
                AlertRule::new(
                    "Temperature Warning",
                    "temperature",
                    70.0,
                    Severity::Warning,
                    "CPU temperature is high",
                ),
                AlertRule::new(
                    "Temperature Critical",
                    "temperature",
                    85.0,
                    Severity::Critical,
                    "CPU temperature is critical",
                ),
            ],
        }
    }

    pub fn from_rules(rules: Vec<AlertRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &AlertRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    pub fn get(&self, rule_name: &str) -> Option<&AlertRule> {
        self.rules.iter().find(|r| r.rule_name == rule_name)
    }

    pub fn set_enabled(&mut self, rule_name: &str, enabled: bool) -> Result<(), RuleError> {
        let rule = self.rule_mut(rule_name)?;
        rule.enabled = enabled;
        Ok(())
    }

    pub fn set_threshold(&mut self, rule_name: &str, threshold: f64) -> Result<(), RuleError> {
        let rule = self.rule_mut(rule_name)?;
        rule.threshold = threshold;
        Ok(())
    }

    fn rule_mut(&mut self, rule_name: &str) -> Result<&mut AlertRule, RuleError> {
        self.rules
            .iter_mut()
            .find(|r| r.rule_name == rule_name)
            .ok_or_else(|| RuleError::UnknownRule(rule_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn default_names_are_unique() {
        let set = AlertRuleSet::with_defaults();
        let names: HashSet<_> = set.rules().iter().map(|r| r.rule_name.as_str()).collect();
        assert_eq!(names.len(), set.rules().len());
    }

    #[test]
    fn default_critical_above_warning() {
        let set = AlertRuleSet::with_defaults();
        let mut by_metric: HashMap<&str, (f64, f64)> = HashMap::new();
        for r in set.rules() {
            let e = by_metric.entry(r.metric_name.as_str()).or_insert((0.0, 0.0));
            match r.severity {
                Severity::Warning => e.0 = r.threshold,
                Severity::Critical => e.1 = r.threshold,
                Severity::Info => {}
            }
        }
        assert_eq!(by_metric.len(), 4);
        for (metric, (warn, crit)) in by_metric {
            assert!(crit > warn, "{metric}: critical {crit} <= warning {warn}");
        }
    }

    #[test]
    fn set_enabled_toggles_active_rules() {
        let mut set = AlertRuleSet::with_defaults();
        let all = set.active_rules().count();
        set.set_enabled("CPU Warning", false).unwrap();
        assert_eq!(set.active_rules().count(), all - 1);
        assert!(set.active_rules().all(|r| r.rule_name != "CPU Warning"));
        set.set_enabled("CPU Warning", true).unwrap();
        assert_eq!(set.active_rules().count(), all);
    }

    #[test]
    fn unknown_rule_is_a_named_error() {
        let mut set = AlertRuleSet::with_defaults();
        let err = set.set_enabled("Fan Warning", false).unwrap_err();
        assert!(matches!(err, RuleError::UnknownRule(ref n) if n == "Fan Warning"));
        assert!(set.set_threshold("Fan Warning", 1.0).is_err());
    }
}
