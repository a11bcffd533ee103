// Latest-known state published by the sampling loop

use serde::{Deserialize, Serialize};

use super::{Alert, MetricSample, ProcessInfo};

/// Tools suggested for one triggered category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub reason: String,
    pub tools: Vec<String>,
}

/// Everything a reader (dashboard, REST API) needs for one frame.
/// Published as a whole; never mutated in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub sample: Option<MetricSample>,
    pub recent_alerts: Vec<Alert>,
    pub processes: Vec<ProcessInfo>,
    pub recommendations: Vec<Recommendation>,
    /// Timestamp of the last successful tick.
    pub last_update: Option<f64>,
    /// Set when the last sample could not be written to the store.
    pub store_degraded: bool,
}
