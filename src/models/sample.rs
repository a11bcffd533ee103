// Metric readings: raw source output and the timestamped sample built from it

use serde::{Deserialize, Serialize};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One point-in-time reading as reported by a metrics source.
/// Timestamp and rates are filled in by the sampling loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub disk_percent: f64,
    pub disk_used_bytes: u64,
    pub disk_total_bytes: u64,
    /// Cumulative counters since boot.
    pub network_sent_bytes: u64,
    pub network_recv_bytes: u64,
    pub process_count: u32,
    pub load_average: [f64; 3],
    pub temperature: Option<f64>,
    pub battery_percent: Option<f64>,
    pub battery_plugged: Option<bool>,
}

/// One timestamped set of system metric readings. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
    pub disk_percent: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub network_sent_mb: f64,
    pub network_recv_mb: f64,
    /// MB/s since the previous sample; 0 on the first sample.
    pub network_sent_rate: f64,
    pub network_recv_rate: f64,
    pub process_count: u32,
    pub load_average: [f64; 3],
    pub temperature: Option<f64>,
    pub battery_percent: Option<f64>,
    pub battery_plugged: Option<bool>,
}

impl MetricSample {
    /// Builds a sample from a raw reading. Rates are derived from `previous`
    /// and clamp to zero when a counter went backwards or no time elapsed.
    pub fn from_raw(raw: &RawMetrics, timestamp: f64, previous: Option<&MetricSample>) -> Self {
        let network_sent_mb = raw.network_sent_bytes as f64 / BYTES_PER_MB;
        let network_recv_mb = raw.network_recv_bytes as f64 / BYTES_PER_MB;

        let (network_sent_rate, network_recv_rate) = match previous {
            Some(prev) if timestamp > prev.timestamp => {
                let dt = timestamp - prev.timestamp;
                (
                    ((network_sent_mb - prev.network_sent_mb) / dt).max(0.0),
                    ((network_recv_mb - prev.network_recv_mb) / dt).max(0.0),
                )
            }
            _ => (0.0, 0.0),
        };

        Self {
            timestamp,
            cpu_percent: raw.cpu_percent,
            memory_percent: raw.memory_percent,
            memory_used_gb: raw.memory_used_bytes as f64 / BYTES_PER_GB,
            memory_total_gb: raw.memory_total_bytes as f64 / BYTES_PER_GB,
            disk_percent: raw.disk_percent,
            disk_used_gb: raw.disk_used_bytes as f64 / BYTES_PER_GB,
            disk_total_gb: raw.disk_total_bytes as f64 / BYTES_PER_GB,
            network_sent_mb,
            network_recv_mb,
            network_sent_rate,
            network_recv_rate,
            process_count: raw.process_count,
            load_average: raw.load_average,
            temperature: raw.temperature,
            battery_percent: raw.battery_percent,
            battery_plugged: raw.battery_plugged,
        }
    }

    /// Looks up a numeric field by name. Returns `None` for unknown names and
    /// for optional readings the source did not provide.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "cpu_percent" => Some(self.cpu_percent),
            "memory_percent" => Some(self.memory_percent),
            "memory_used_gb" => Some(self.memory_used_gb),
            "memory_total_gb" => Some(self.memory_total_gb),
            "disk_percent" => Some(self.disk_percent),
            "disk_used_gb" => Some(self.disk_used_gb),
            "disk_total_gb" => Some(self.disk_total_gb),
            "network_sent_mb" => Some(self.network_sent_mb),
            "network_recv_mb" => Some(self.network_recv_mb),
            "network_sent_rate" => Some(self.network_sent_rate),
            "network_recv_rate" => Some(self.network_recv_rate),
            "process_count" => Some(self.process_count as f64),
            "load_average_1m" => Some(self.load_average[0]),
            "load_average_5m" => Some(self.load_average[1]),
            "load_average_15m" => Some(self.load_average[2]),
            "temperature" => self.temperature,
            "battery_percent" => self.battery_percent,
            _ => None,
        }
    }
}

/// Names accepted by [`MetricSample::metric`].
pub const METRIC_NAMES: &[&str] = &[
    "cpu_percent",
    "memory_percent",
    "memory_used_gb",
    "memory_total_gb",
    "disk_percent",
    "disk_used_gb",
    "disk_total_gb",
    "network_sent_mb",
    "network_recv_mb",
    "network_sent_rate",
    "network_recv_rate",
    "process_count",
    "load_average_1m",
    "load_average_5m",
    "load_average_15m",
    "temperature",
    "battery_percent",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(sent: u64, recv: u64) -> RawMetrics {
        RawMetrics {
            network_sent_bytes: sent,
            network_recv_bytes: recv,
            ..RawMetrics::default()
        }
    }

    #[test]
    fn first_sample_has_zero_rates() {
        let s = MetricSample::from_raw(&raw(50 * 1024 * 1024, 80 * 1024 * 1024), 100.0, None);
        assert_eq!(s.network_sent_rate, 0.0);
        assert_eq!(s.network_recv_rate, 0.0);
        assert_eq!(s.network_sent_mb, 50.0);
    }

    #[test]
    fn rates_are_delta_over_elapsed_seconds() {
        let first = MetricSample::from_raw(&raw(0, 0), 100.0, None);
        let second =
            MetricSample::from_raw(&raw(10 * 1024 * 1024, 4 * 1024 * 1024), 102.0, Some(&first));
        assert_eq!(second.network_sent_rate, 5.0);
        assert_eq!(second.network_recv_rate, 2.0);
    }

    #[test]
    fn counter_reset_does_not_go_negative() {
        let first = MetricSample::from_raw(&raw(1024 * 1024, 1024 * 1024), 100.0, None);
        let second = MetricSample::from_raw(&raw(0, 0), 101.0, Some(&first));
        assert_eq!(second.network_sent_rate, 0.0);
        assert_eq!(second.network_recv_rate, 0.0);
    }

    #[test]
    fn totals_and_counters_resolve_by_name() {
        let r = RawMetrics {
            memory_total_bytes: 16 * 1024 * 1024 * 1024,
            disk_total_bytes: 512 * 1024 * 1024 * 1024,
            ..raw(3 * 1024 * 1024, 7 * 1024 * 1024)
        };
        let s = MetricSample::from_raw(&r, 1.0, None);
        assert_eq!(s.metric("memory_total_gb"), Some(16.0));
        assert_eq!(s.metric("disk_total_gb"), Some(512.0));
        assert_eq!(s.metric("network_sent_mb"), Some(3.0));
        assert_eq!(s.metric("network_recv_mb"), Some(7.0));
        for name in ["memory_total_gb", "disk_total_gb", "network_sent_mb", "network_recv_mb"] {
            assert!(METRIC_NAMES.contains(&name));
        }
    }

    #[test]
    fn metric_lookup_skips_absent_optionals() {
        let s = MetricSample::from_raw(&RawMetrics::default(), 1.0, None);
        assert_eq!(s.metric("cpu_percent"), Some(0.0));
        assert_eq!(s.metric("temperature"), None);
        assert_eq!(s.metric("no_such_metric"), None);
        for name in METRIC_NAMES {
            if *name != "temperature" && *name != "battery_percent" {
                assert!(s.metric(name).is_some(), "{name} should resolve");
            }
        }
    }
}
