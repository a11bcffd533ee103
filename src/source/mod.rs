// Metrics source: the OS boundary. Production readings come from sysinfo,
// with /sys fallbacks for temperature and battery.

mod linux;

use crate::models::{ProcessInfo, RawMetrics};
use std::sync::Mutex;
use sysinfo::{Components, Disks, Networks, ProcessesToUpdate, System};
use tracing::instrument;

/// Point-in-time system readings.
///
/// Calls are blocking; the sampling loop runs them on the blocking pool.
/// Any error is treated by the caller as "skip this tick".
pub trait MetricsSource: Send + Sync + 'static {
    fn read(&self) -> anyhow::Result<RawMetrics>;

    /// Every running process, in no particular order. Best effort; used for display only.
    fn processes(&self) -> anyhow::Result<Vec<ProcessInfo>> {
        Ok(Vec::new())
    }
}

pub struct SysinfoSource {
    sys: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
    components: Mutex<Components>,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        Self {
            sys: Mutex::new(sys),
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
            components: Mutex::new(Components::new_with_refreshed_list()),
        }
    }

    fn read_temperature(&self) -> Option<f64> {
        let from_components = self.components.lock().ok().and_then(|mut components| {
            components.refresh(false);
            let temps: Vec<(String, f32)> = components
                .list()
                .iter()
                .filter_map(|c| c.temperature().map(|t| (c.label().to_lowercase(), t)))
                .filter(|(_, t)| t.is_finite() && *t > 0.0)
                .collect();
            let cpu_max = temps
                .iter()
                .filter(|(label, _)| {
                    ["cpu", "package", "coretemp", "k10temp", "tctl"]
                        .iter()
                        .any(|k| label.contains(k))
                })
                .map(|(_, t)| *t)
                .reduce(f32::max);
            cpu_max.or_else(|| temps.iter().map(|(_, t)| *t).reduce(f32::max))
        });
        from_components
            .map(f64::from)
            .or_else(linux::read_thermal_zone_celsius)
    }
}

impl MetricsSource for SysinfoSource {
    #[instrument(skip(self), fields(source = "sysinfo", operation = "read"))]
    fn read(&self) -> anyhow::Result<RawMetrics> {
        let (cpu_percent, memory_used, memory_total, process_count) = {
            let mut sys = self
                .sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_cpu_usage();
            sys.refresh_memory();
            sys.refresh_processes(ProcessesToUpdate::All, true);
            let total = sys.total_memory();
            let used = total.saturating_sub(sys.available_memory());
            (
                (sys.global_cpu_usage() as f64).clamp(0.0, 100.0),
                used,
                total,
                sys.processes().len().min(u32::MAX as usize) as u32,
            )
        };

        let (disk_used, disk_total) = {
            let mut disks = self
                .disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks.refresh(true);
            let root = disks
                .list()
                .iter()
                .find(|d| d.mount_point() == std::path::Path::new("/"));
            match root {
                Some(d) => (
                    d.total_space().saturating_sub(d.available_space()),
                    d.total_space(),
                ),
                None => disks.list().iter().fold((0u64, 0u64), |(u, t), d| {
                    (
                        u + d.total_space().saturating_sub(d.available_space()),
                        t + d.total_space(),
                    )
                }),
            }
        };

        let (sent, recv) = {
            let mut networks = self
                .networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            networks.refresh(true);
            networks.list().values().fold((0u64, 0u64), |(s, r), data| {
                (
                    s.saturating_add(data.total_transmitted()),
                    r.saturating_add(data.total_received()),
                )
            })
        };

        let load = System::load_average();
        let battery = linux::read_battery();

        Ok(RawMetrics {
            cpu_percent,
            memory_percent: percent(memory_used, memory_total),
            memory_used_bytes: memory_used,
            memory_total_bytes: memory_total,
            disk_percent: percent(disk_used, disk_total),
            disk_used_bytes: disk_used,
            disk_total_bytes: disk_total,
            network_sent_bytes: sent,
            network_recv_bytes: recv,
            process_count,
            load_average: [load.one, load.five, load.fifteen],
            temperature: self.read_temperature(),
            battery_percent: battery.as_ref().map(|b| b.percent),
            battery_plugged: battery.map(|b| b.plugged),
        })
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "processes"))]
    fn processes(&self) -> anyhow::Result<Vec<ProcessInfo>> {
        let sys = self
            .sys
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
        let total = sys.total_memory();
        let out: Vec<ProcessInfo> = sys
            .processes()
            .iter()
            .map(|(pid, p)| ProcessInfo {
                pid: pid.as_u32(),
                name: p.name().to_string_lossy().into_owned(),
                cpu_percent: p.cpu_usage() as f64,
                memory_percent: percent(p.memory(), total),
                memory_mb: p.memory() as f64 / (1024.0 * 1024.0),
                status: p.status().to_string(),
            })
            .collect();
        Ok(out)
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::percent;

    #[test]
    fn percent_of_zero_total_is_zero() {
        assert_eq!(percent(10, 0), 0.0);
        assert_eq!(percent(25, 100), 25.0);
    }
}
