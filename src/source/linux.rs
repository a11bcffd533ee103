// Linux-specific sensor helpers: /sys thermal zones and power supplies.

pub(super) struct Battery {
    pub percent: f64,
    pub plugged: bool,
}

/// First thermal zone reading in °C (/sys reports millidegrees).
pub(super) fn read_thermal_zone_celsius() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/sys/class/thermal/thermal_zone0/temp").ok()?;
        return parse_millidegrees(&content);
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Capacity and AC state of the first BAT* power supply.
pub(super) fn read_battery() -> Option<Battery> {
    #[cfg(target_os = "linux")]
    {
        let entries = std::fs::read_dir("/sys/class/power_supply").ok()?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with("BAT") {
                continue;
            }
            let dir = entry.path();
            let capacity = std::fs::read_to_string(dir.join("capacity")).ok()?;
            let status = std::fs::read_to_string(dir.join("status")).unwrap_or_default();
            return parse_battery(&capacity, &status);
        }
    }
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_millidegrees(s: &str) -> Option<f64> {
    let milli: i64 = s.trim().parse().ok()?;
    (milli > 0).then(|| milli as f64 / 1000.0)
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_battery(capacity: &str, status: &str) -> Option<Battery> {
    let percent: f64 = capacity.trim().parse().ok()?;
    // "Discharging" is the only state that means running on battery.
    let plugged = !status.trim().eq_ignore_ascii_case("discharging");
    Some(Battery {
        percent: percent.clamp(0.0, 100.0),
        plugged,
    })
}
