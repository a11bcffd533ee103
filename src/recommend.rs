// Static tool recommendations: trigger category -> ranked tool list.

use crate::models::{MetricSample, Recommendation};

struct Entry {
    label: &'static str,
    tools: &'static [&'static str],
    /// Returns the reason line when the sample triggers this category.
    trigger: fn(&MetricSample) -> Option<String>,
}

const TABLE: &[Entry] = &[
    Entry {
        label: "cpu",
        tools: &["htop", "btop", "perf top", "pidstat"],
        trigger: |s| {
            (s.cpu_percent >= 80.0).then(|| format!("CPU at {:.0}%", s.cpu_percent))
        },
    },
    Entry {
        label: "memory",
        tools: &["smem", "htop", "earlyoom", "vmstat"],
        trigger: |s| {
            (s.memory_percent >= 85.0).then(|| format!("memory at {:.0}%", s.memory_percent))
        },
    },
    Entry {
        label: "disk",
        tools: &["ncdu", "dust", "duf", "bleachbit"],
        trigger: |s| (s.disk_percent >= 90.0).then(|| format!("disk at {:.0}%", s.disk_percent)),
    },
    Entry {
        label: "thermal",
        tools: &["sensors", "powertop", "s-tui"],
        trigger: |s| {
            s.temperature
                .filter(|t| *t >= 75.0)
                .map(|t| format!("temperature at {:.0}°C", t))
        },
    },
    Entry {
        label: "battery",
        tools: &["powertop", "tlp", "upower"],
        trigger: |s| match (s.battery_percent, s.battery_plugged) {
            (Some(p), Some(false)) if p <= 20.0 => Some(format!("battery at {:.0}%, unplugged", p)),
            _ => None,
        },
    },
    Entry {
        label: "network",
        tools: &["nethogs", "iftop", "bandwhich", "nload"],
        trigger: |s| {
            let rate = s.network_sent_rate + s.network_recv_rate;
            (rate >= 10.0).then(|| format!("network at {:.1} MB/s", rate))
        },
    },
];

const HEALTHY_TOOLS: &[&str] = &["btop", "glances"];

/// Recommendations triggered by `sample`, in table order. A quiet system
/// yields a single "healthy" entry.
pub fn recommend(sample: &MetricSample) -> Vec<Recommendation> {
    let out: Vec<Recommendation> = TABLE
        .iter()
        .filter_map(|e| {
            (e.trigger)(sample).map(|reason| Recommendation {
                category: e.label.to_string(),
                reason,
                tools: e.tools.iter().map(|t| t.to_string()).collect(),
            })
        })
        .collect();
    if out.is_empty() {
        return vec![Recommendation {
            category: "healthy".to_string(),
            reason: "no resource pressure detected".to_string(),
            tools: HEALTHY_TOOLS.iter().map(|t| t.to_string()).collect(),
        }];
    }
    out
}
