use std::path::{Path, PathBuf};

use crate::error::MetricError;
use crate::system::snapshot::round2;
use crate::system::sysfs::{Sysfs, read_millidegrees, read_parsed};

use super::{GpuReader, GpuReading, GpuVendor};

/// amdgpu exposes utilization on the PCI device node and sensors on a
/// hwmon child whose index varies between boots.
pub struct AmdSysfsReader {
    device_dir: PathBuf,
    hwmon_override: Option<PathBuf>,
    hwmon: Option<PathBuf>,
}

impl AmdSysfsReader {
    pub fn new(sysfs: &Sysfs, card: &str, hwmon_override: Option<PathBuf>) -> Self {
        AmdSysfsReader {
            device_dir: sysfs.path(format!("class/drm/{card}/device")),
            hwmon: hwmon_override.clone(),
            hwmon_override,
        }
    }

    fn hwmon_dir(&mut self) -> Result<PathBuf, MetricError> {
        if let Some(dir) = &self.hwmon {
            return Ok(dir.clone());
        }
        let dir = discover_hwmon(&self.device_dir.join("hwmon")).ok_or_else(|| {
            MetricError::unavailable(
                "GPU temperature",
                format!("no hwmon sensor under {}", self.device_dir.display()),
            )
        })?;
        tracing::debug!(hwmon = %dir.display(), "discovered GPU sensor directory");
        self.hwmon = Some(dir.clone());
        Ok(dir)
    }
}

impl GpuReader for AmdSysfsReader {
    fn vendor(&self) -> GpuVendor {
        GpuVendor::Amd
    }

    fn read(&mut self) -> Result<GpuReading, MetricError> {
        let usage: u32 = read_parsed("GPU usage", &self.device_dir.join("gpu_busy_percent"))?;
        let hwmon = self.hwmon_dir()?;
        let temp_celsius = match read_millidegrees("GPU temperature", &hwmon.join("temp1_input")) {
            Ok(temp) => temp,
            Err(err) => {
                // Rediscover next tick unless the path was pinned in config.
                self.hwmon = self.hwmon_override.clone();
                return Err(err);
            }
        };

        Ok(GpuReading {
            usage_percent: usage.min(100) as u8,
            temp_celsius,
            power_watts: read_power(&hwmon),
        })
    }
}

/// Microwatts; older kernels only expose the instantaneous node.
fn read_power(hwmon: &Path) -> Option<f64> {
    ["power1_average", "power1_input"]
        .iter()
        .find_map(|node| read_parsed::<u64>("GPU power", &hwmon.join(node)).ok())
        .map(|uw| round2(uw as f64 / 1_000_000.0))
}

fn discover_hwmon(hwmon_root: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(hwmon_root)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("hwmon"))
                && path.join("temp1_input").exists()
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}
