use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::MetricError;

use super::snapshot::round2;
use super::sysfs::{Sysfs, read_parsed};

const METRIC: &str = "CPU power";
const PACKAGE_DIR: &str = "class/powercap/intel-rapl/intel-rapl:0";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    pub energy_uj: u64,
    pub at: Instant,
}

/// Package power from the RAPL energy counter.
///
/// The counter only yields power as a difference, so the meter keeps the
/// previous sample between ticks. The first call primes it by sampling twice
/// across `sample_window`.
#[derive(Debug)]
pub struct RaplMeter {
    energy_path: PathBuf,
    range_path: PathBuf,
    sample_window: Duration,
    last: Option<EnergySample>,
}

impl RaplMeter {
    pub fn new(sysfs: &Sysfs, sample_window: Duration) -> Self {
        let package = sysfs.path(PACKAGE_DIR);
        RaplMeter {
            energy_path: package.join("energy_uj"),
            range_path: package.join("max_energy_range_uj"),
            sample_window,
            last: None,
        }
    }

    /// `Ok(None)` when the host exposes no RAPL domain; that is an expected
    /// absence, not a failure.
    pub fn read_watts(&mut self) -> Result<Option<f64>, MetricError> {
        let first = match self.sample() {
            Ok(sample) => sample,
            Err(MetricError::Unavailable { .. }) if !self.energy_path.exists() => {
                self.last = None;
                return Ok(None);
            }
            Err(err) => {
                self.last = None;
                return Err(err);
            }
        };

        let (previous, current) = match self.last {
            Some(previous) => (previous, first),
            None => {
                std::thread::sleep(self.sample_window);
                (first, self.sample()?)
            }
        };
        self.last = Some(current);

        let range = read_parsed::<u64>(METRIC, &self.range_path).ok();
        Ok(power_between(previous, current, range))
    }

    fn sample(&self) -> Result<EnergySample, MetricError> {
        let energy_uj = read_parsed(METRIC, &self.energy_path)?;
        Ok(EnergySample {
            energy_uj,
            at: Instant::now(),
        })
    }
}

/// Average watts between two counter samples, correcting a single
/// wraparound when the counter range is known.
pub fn power_between(
    previous: EnergySample,
    current: EnergySample,
    max_range_uj: Option<u64>,
) -> Option<f64> {
    let elapsed = current.at.checked_duration_since(previous.at)?.as_secs_f64();
    if elapsed <= 0.0 {
        return None;
    }
    let delta_uj = if current.energy_uj >= previous.energy_uj {
        current.energy_uj - previous.energy_uj
    } else {
        let range = max_range_uj?;
        range.checked_sub(previous.energy_uj)? + current.energy_uj
    };
    Some(round2(delta_uj as f64 / 1_000_000.0 / elapsed))
}
