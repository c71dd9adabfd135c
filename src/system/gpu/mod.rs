//! Vendor-specific GPU read strategies.
//!
//! The sampler only sees [`GpuReader`]; supporting another vendor means adding
//! a variant to [`GpuVendor`] and a reader behind it.

mod amd;
mod nvidia;

pub use amd::AmdSysfsReader;
pub use nvidia::NvidiaSmiReader;

use crate::config::GpuConfig;
use crate::error::MetricError;

use super::sysfs::Sysfs;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuReading {
    pub usage_percent: u8,
    pub temp_celsius: f64,
    pub power_watts: Option<f64>,
}

pub trait GpuReader: Send {
    fn vendor(&self) -> GpuVendor;

    /// An `Err` means the GPU is unsupported for this tick; the sampler
    /// reports null fields plus a warning.
    fn read(&mut self) -> Result<GpuReading, MetricError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuVendor {
    #[default]
    Amd,
    Nvidia,
    Disabled,
}

impl GpuVendor {
    pub fn from_str_config(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "nvidia" => GpuVendor::Nvidia,
            "none" | "off" | "disabled" => GpuVendor::Disabled,
            "amd" | "amdgpu" => GpuVendor::Amd,
            other => {
                tracing::warn!(vendor = other, "unknown GPU vendor, using amd");
                GpuVendor::Amd
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GpuVendor::Amd => "amd",
            GpuVendor::Nvidia => "nvidia",
            GpuVendor::Disabled => "none",
        }
    }
}

/// Builds the reader selected by `gpu.vendor`. `None` disables GPU metrics.
pub fn reader_for(config: &GpuConfig, sysfs: &Sysfs) -> Option<Box<dyn GpuReader>> {
    match GpuVendor::from_str_config(&config.vendor) {
        GpuVendor::Amd => Some(Box::new(AmdSysfsReader::new(
            sysfs,
            &config.card,
            config.hwmon_path.clone(),
        ))),
        GpuVendor::Nvidia => Some(Box::new(NvidiaSmiReader::default())),
        GpuVendor::Disabled => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_names() {
        assert_eq!(GpuVendor::from_str_config("AMD"), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_str_config("nvidia"), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_str_config("none"), GpuVendor::Disabled);
        assert_eq!(GpuVendor::from_str_config("intel"), GpuVendor::Amd);
    }

    #[test]
    fn factory_selects_reader() {
        let sysfs = Sysfs::default();
        let amd = reader_for(&GpuConfig::default(), &sysfs).unwrap();
        assert_eq!(amd.vendor(), GpuVendor::Amd);

        let nvidia = GpuConfig {
            vendor: "nvidia".to_string(),
            ..GpuConfig::default()
        };
        assert_eq!(reader_for(&nvidia, &sysfs).unwrap().vendor(), GpuVendor::Nvidia);

        let disabled = GpuConfig {
            vendor: "none".to_string(),
            ..GpuConfig::default()
        };
        assert!(reader_for(&disabled, &sysfs).is_none());
    }
}
