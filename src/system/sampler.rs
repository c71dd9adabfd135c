use std::time::Duration;

use sysinfo::System;

use crate::config::Config;

use super::SnapshotSource;
use super::gpu::{self, GpuReader};
use super::rapl::RaplMeter;
use super::snapshot::{CpuStats, GpuStats, MemoryStats, Snapshot, Warnings, clamp_percent, round1};
use super::sysfs::Sysfs;
use super::thermal;

/// Reads every metric source independently and assembles one [`Snapshot`]
/// per call. A failing source yields null fields and a warning; it never
/// aborts the sample.
pub struct Sampler {
    sys: System,
    sysfs: Sysfs,
    rapl: RaplMeter,
    gpu: Option<Box<dyn GpuReader>>,
}

impl Sampler {
    pub fn new(config: &Config) -> Self {
        let sysfs = Sysfs::new(&config.monitoring.sysfs_root);
        let gpu = gpu::reader_for(&config.gpu, &sysfs);
        Self::with_parts(sysfs, gpu, Duration::from_millis(config.monitoring.power_sample_ms))
    }

    pub fn with_parts(
        sysfs: Sysfs,
        gpu: Option<Box<dyn GpuReader>>,
        power_sample_window: Duration,
    ) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        // CPU usage is a delta between two refreshes.
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

        let rapl = RaplMeter::new(&sysfs, power_sample_window);
        tracing::debug!(
            sysfs = %sysfs.root().display(),
            gpu = gpu.as_ref().map(|g| g.vendor().label()).unwrap_or("none"),
            "sampler ready"
        );
        Sampler {
            sys,
            sysfs,
            rapl,
            gpu,
        }
    }

    fn cpu(&mut self, warnings: &mut Warnings) -> CpuStats {
        self.sys.refresh_cpu_all();

        let cpu_power_watts = match self.rapl.read_watts() {
            Ok(watts) => watts,
            Err(err) => {
                warnings.push(&err);
                None
            }
        };

        let cpu_temp_celsius = match thermal::cpu_temperature(&self.sysfs) {
            Ok(temp) => Some(temp),
            Err(err) => {
                warnings.push(&err);
                None
            }
        };

        let cpus = self.sys.cpus();
        let cpu_freq_mhz = if cpus.is_empty() {
            None
        } else {
            let total: u64 = cpus.iter().map(|c| c.frequency()).sum();
            Some(total as f64 / cpus.len() as f64).filter(|mhz| *mhz > 0.0)
        };
        let (cpu_freq_min_mhz, cpu_freq_max_mhz) = thermal::frequency_bounds(&self.sysfs);

        CpuStats {
            cpu_percent: clamp_percent(round1(f64::from(self.sys.global_cpu_usage()))),
            cpu_freq_mhz: cpu_freq_mhz.map(round1),
            cpu_freq_min_mhz,
            cpu_freq_max_mhz,
            cpu_temp_celsius,
            cpu_power_watts,
        }
    }

    fn memory(&mut self) -> MemoryStats {
        self.sys.refresh_memory();
        MemoryStats::from_bytes(self.sys.total_memory(), self.sys.used_memory())
    }

    fn gpu(&mut self, warnings: &mut Warnings) -> GpuStats {
        let Some(reader) = self.gpu.as_mut() else {
            return GpuStats::default();
        };
        match reader.read() {
            Ok(reading) => GpuStats {
                gpu_usage_percent: Some(reading.usage_percent),
                gpu_temp_celsius: Some(reading.temp_celsius),
                gpu_power_watts: reading.power_watts,
            },
            Err(err) => {
                tracing::debug!(error = %err, "GPU read failed");
                warnings.push(&err);
                GpuStats::default()
            }
        }
    }
}

impl SnapshotSource for Sampler {
    fn sample(&mut self) -> Snapshot {
        let _span = tracing::debug_span!("sampler.sample").entered();

        let mut warnings = Warnings::default();
        let cpu = self.cpu(&mut warnings);
        let memory = self.memory();
        let gpu = self.gpu(&mut warnings);

        Snapshot {
            cpu,
            memory,
            gpu,
            warning: warnings.into_message(),
        }
    }
}
