use serde::{Deserialize, Deserializer, Serialize};

use crate::error::MetricError;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    pub cpu_percent: f64,
    #[serde(default)]
    pub cpu_freq_mhz: Option<f64>,
    #[serde(default)]
    pub cpu_freq_min_mhz: Option<f64>,
    #[serde(default)]
    pub cpu_freq_max_mhz: Option<f64>,
    #[serde(default)]
    pub cpu_temp_celsius: Option<f64>,
    #[serde(default)]
    pub cpu_power_watts: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_gb: f64,
    pub used_gb: f64,
    pub percent: f64,
}

impl MemoryStats {
    /// Builds the record from gigabyte readings, holding `used <= total` and
    /// `percent` in [0, 100].
    pub fn new(total_gb: f64, used_gb: f64, percent: f64) -> Self {
        let total_gb = non_negative(total_gb);
        MemoryStats {
            total_gb,
            used_gb: non_negative(used_gb).min(total_gb),
            percent: clamp_percent(percent),
        }
    }

    pub fn from_bytes(total: u64, used: u64) -> Self {
        let used = used.min(total);
        let percent = if total == 0 {
            0.0
        } else {
            round1(used as f64 / total as f64 * 100.0)
        };
        MemoryStats::new(
            round2(total as f64 / BYTES_PER_GB),
            round2(used as f64 / BYTES_PER_GB),
            percent,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuStats {
    #[serde(default, deserialize_with = "lenient_percent")]
    pub gpu_usage_percent: Option<u8>,
    #[serde(default)]
    pub gpu_temp_celsius: Option<f64>,
    #[serde(default)]
    pub gpu_power_watts: Option<f64>,
}

/// One point-in-time reading. Built once per tick and never mutated.
///
/// `warning` travels in the document metadata, not under `stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub gpu: GpuStats,
    #[serde(skip)]
    pub warning: Option<String>,
}

impl Snapshot {
    /// Re-applies the range invariants to readings of unknown provenance.
    pub fn sanitized(mut self) -> Self {
        self.cpu.cpu_percent = clamp_percent(self.cpu.cpu_percent);
        self.memory = MemoryStats::new(
            self.memory.total_gb,
            self.memory.used_gb,
            self.memory.percent,
        );
        self.gpu.gpu_usage_percent = self.gpu.gpu_usage_percent.map(|p| p.min(100));
        self
    }

    pub fn satisfies_invariants(&self) -> bool {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        in_range(self.cpu.cpu_percent)
            && in_range(self.memory.percent)
            && self.memory.used_gb >= 0.0
            && self.memory.used_gb <= self.memory.total_gb
            && self.gpu.gpu_usage_percent.is_none_or(|p| p <= 100)
    }
}

/// Collects per-metric failures during a tick.
#[derive(Debug, Default)]
pub struct Warnings {
    messages: Vec<String>,
}

impl Warnings {
    pub fn push(&mut self, err: &MetricError) {
        self.push_message(err.to_string());
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.messages.contains(&message) {
            self.messages.push(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_message(self) -> Option<String> {
        if self.messages.is_empty() {
            None
        } else {
            Some(self.messages.join("; "))
        }
    }
}

pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Older writers emitted GPU usage as a float.
fn lenient_percent<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|v| clamp_percent(v).round() as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            cpu: CpuStats {
                cpu_percent: 25.5,
                cpu_freq_mhz: Some(3400.0),
                cpu_freq_min_mhz: Some(400.0),
                cpu_freq_max_mhz: Some(5200.0),
                cpu_temp_celsius: Some(55.0),
                cpu_power_watts: Some(45.23),
            },
            memory: MemoryStats::new(16.0, 8.5, 53.1),
            gpu: GpuStats {
                gpu_usage_percent: Some(15),
                gpu_temp_celsius: Some(65.0),
                gpu_power_watts: Some(37.5),
            },
            warning: None,
        }
    }

    #[test]
    fn memory_from_bytes_converts_to_gb() {
        let mem = MemoryStats::from_bytes(16 * 1024 * 1024 * 1024, 8 * 1024 * 1024 * 1024);
        assert_eq!(mem.total_gb, 16.0);
        assert_eq!(mem.used_gb, 8.0);
        assert_eq!(mem.percent, 50.0);
    }

    #[test]
    fn memory_zero_total() {
        let mem = MemoryStats::from_bytes(0, 0);
        assert_eq!(mem, MemoryStats::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn used_never_exceeds_total() {
        let mem = MemoryStats::new(8.0, 12.0, 150.0);
        assert_eq!(mem.used_gb, 8.0);
        assert_eq!(mem.percent, 100.0);
    }

    #[test]
    fn sanitized_clamps_foreign_readings() {
        let mut raw = snapshot();
        raw.cpu.cpu_percent = 130.0;
        raw.memory.used_gb = 20.0;
        raw.gpu.gpu_usage_percent = Some(250);
        assert!(!raw.satisfies_invariants());

        let clean = raw.sanitized();
        assert!(clean.satisfies_invariants());
        assert_eq!(clean.cpu.cpu_percent, 100.0);
        assert_eq!(clean.memory.used_gb, 16.0);
        assert_eq!(clean.gpu.gpu_usage_percent, Some(100));
    }

    #[test]
    fn warnings_join_and_dedupe() {
        let mut warnings = Warnings::default();
        assert!(warnings.is_empty());
        let power = MetricError::PrivilegeRequired { metric: "CPU power" };
        warnings.push(&power);
        warnings.push(&power);
        warnings.push_message("GPU usage unavailable: no card");
        assert_eq!(
            warnings.into_message().as_deref(),
            Some("CPU power unavailable - run with sudo; GPU usage unavailable: no card")
        );
        assert_eq!(Warnings::default().into_message(), None);
    }

    #[test]
    fn gpu_usage_accepts_float_input() {
        let gpu: GpuStats =
            serde_json::from_str(r#"{"gpu_usage_percent": 15.0, "gpu_temp_celsius": 65}"#).unwrap();
        assert_eq!(gpu.gpu_usage_percent, Some(15));
        assert_eq!(gpu.gpu_temp_celsius, Some(65.0));
        assert_eq!(gpu.gpu_power_watts, None);
    }

    #[test]
    fn stats_keys_are_stable_when_optionals_are_absent() {
        let snap = Snapshot {
            cpu: CpuStats {
                cpu_percent: 1.0,
                cpu_freq_mhz: None,
                cpu_freq_min_mhz: None,
                cpu_freq_max_mhz: None,
                cpu_temp_celsius: None,
                cpu_power_watts: None,
            },
            memory: MemoryStats::new(1.0, 0.5, 50.0),
            gpu: GpuStats::default(),
            warning: Some("ignored here".to_string()),
        };
        let value = serde_json::to_value(&snap).unwrap();
        assert!(value["cpu"]["cpu_power_watts"].is_null());
        assert!(value["gpu"].as_object().unwrap().contains_key("gpu_usage_percent"));
        assert!(value.get("warning").is_none());
    }

    proptest! {
        #[test]
        fn memory_invariants_hold(total in any::<u64>(), used in any::<u64>()) {
            let mem = MemoryStats::from_bytes(total, used);
            prop_assert!(mem.used_gb >= 0.0);
            prop_assert!(mem.used_gb <= mem.total_gb);
            prop_assert!((0.0..=100.0).contains(&mem.percent));
        }

        #[test]
        fn clamp_percent_stays_in_range(value in any::<f64>()) {
            let clamped = clamp_percent(value);
            prop_assert!((0.0..=100.0).contains(&clamped));
        }

        #[test]
        fn sanitized_snapshots_are_valid(
            cpu in -1e6f64..1e6,
            total in -1e3f64..1e3,
            used in -1e3f64..1e3,
            percent in -1e3f64..1e3,
            gpu in proptest::option::of(any::<u8>()),
        ) {
            let mut snap = snapshot();
            snap.cpu.cpu_percent = cpu;
            snap.memory = MemoryStats { total_gb: total, used_gb: used, percent };
            snap.gpu.gpu_usage_percent = gpu;
            prop_assert!(snap.sanitized().satisfies_invariants());
        }
    }
}
