use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::MetricError;

/// Resolves kernel telemetry nodes under a configurable root so fixture
/// trees can stand in for `/sys`.
#[derive(Debug, Clone)]
pub struct Sysfs {
    root: PathBuf,
}

impl Default for Sysfs {
    fn default() -> Self {
        Sysfs::new("/sys")
    }
}

impl Sysfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Sysfs { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

pub fn read_trimmed(metric: &'static str, path: &Path) -> Result<String, MetricError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|err| MetricError::from_io(metric, path, &err))
}

pub fn read_parsed<T: FromStr>(metric: &'static str, path: &Path) -> Result<T, MetricError> {
    let raw = read_trimmed(metric, path)?;
    raw.parse().map_err(|_| {
        MetricError::unavailable(metric, format!("cannot parse `{raw}` from {}", path.display()))
    })
}

/// Sensor nodes report millidegrees Celsius.
pub fn read_millidegrees(metric: &'static str, path: &Path) -> Result<f64, MetricError> {
    read_parsed::<i64>(metric, path).map(|m| m as f64 / 1000.0)
}
