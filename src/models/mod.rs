// Domain models

mod alert;
mod process;
mod sample;
mod snapshot;

pub use alert::{Alert, AlertRule, Severity};
pub use process::ProcessInfo;
pub use sample::{METRIC_NAMES, MetricSample, RawMetrics};
pub use snapshot::{Recommendation, Snapshot};

/// Current wall-clock time as seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0.0
        })
}
