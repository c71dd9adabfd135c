use sysinfo::Components;

use crate::error::MetricError;

use super::sysfs::{Sysfs, read_millidegrees, read_parsed};

const METRIC: &str = "CPU temperature";
const THERMAL_ZONE: &str = "class/thermal/thermal_zone0/temp";
const CPU_SENSOR_LABELS: [&str; 6] = [
    "coretemp",
    "k10temp",
    "cpu_thermal",
    "cpu-thermal",
    "tctl",
    "package id",
];

/// Package temperature from the first thermal zone, falling back to a
/// hardware sensor with a CPU-like label.
pub fn cpu_temperature(sysfs: &Sysfs) -> Result<f64, MetricError> {
    let zone_err = match read_millidegrees(METRIC, &sysfs.path(THERMAL_ZONE)) {
        Ok(temp) => return Ok(temp),
        Err(err) => err,
    };

    let components = Components::new_with_refreshed_list();
    components
        .list()
        .iter()
        .filter(|c| is_cpu_sensor(c.label()))
        .find_map(|c| c.temperature())
        .map(f64::from)
        .ok_or(zone_err)
}

pub fn is_cpu_sensor(label: &str) -> bool {
    let label = label.to_lowercase();
    CPU_SENSOR_LABELS.iter().any(|known| label.contains(known))
}

/// cpufreq bounds for cpu0 in MHz; the nodes report kHz.
pub fn frequency_bounds(sysfs: &Sysfs) -> (Option<f64>, Option<f64>) {
    let read = |node: &str| {
        read_parsed::<u64>(
            "CPU frequency",
            &sysfs.path(format!("devices/system/cpu/cpu0/cpufreq/{node}")),
        )
        .ok()
        .map(|khz| khz as f64 / 1000.0)
    };
    (read("cpuinfo_min_freq"), read("cpuinfo_max_freq"))
}
