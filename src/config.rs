use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_TARGET_PATH: &str = "/data/local/tmp/system_stats.json";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub appearance: AppearanceConfig,
    pub bridge: BridgeConfig,
    pub monitoring: MonitoringConfig,
    pub gpu: GpuConfig,
}

/// Raw appearance values as written by the control surface. Validation and
/// clamping happen in [`crate::appearance::Appearance::from_config`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    pub background_color: String,
    pub text_color: String,
    #[serde(alias = "tile_background_color")]
    pub accent_color: String,
    /// Text drawn on metric tiles. Unset means "same as `text_color`".
    pub tile_text_color: Option<String>,
    pub font_size: u32,
    pub theme: String,
    pub show_graphs: bool,
    pub refresh_rate_ms: u64,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        AppearanceConfig {
            background_color: "#1e1e1e".to_string(),
            text_color: "#ffffff".to_string(),
            accent_color: "#0078d4".to_string(),
            tile_text_color: None,
            font_size: 14,
            theme: "dark".to_string(),
            show_graphs: true,
            refresh_rate_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub program: String,
    pub device_id: Option<String>,
    pub target_path: String,
    pub timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            program: "adb".to_string(),
            device_id: None,
            target_path: DEFAULT_TARGET_PATH.to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Fixed publish interval. When unset the interval follows the output
    /// format: 5s for legacy, `appearance.refresh_rate_ms` otherwise.
    pub interval_ms: Option<u64>,
    pub format: String,
    pub power_sample_ms: u64,
    pub sysfs_root: PathBuf,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        MonitoringConfig {
            interval_ms: None,
            format: "current".to_string(),
            power_sample_ms: 100,
            sysfs_root: PathBuf::from("/sys"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    pub vendor: String,
    pub card: String,
    pub hwmon_path: Option<PathBuf>,
}

impl Default for GpuConfig {
    fn default() -> Self {
        GpuConfig {
            vendor: "amd".to_string(),
            card: "card1".to_string(),
            hwmon_path: None,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sysmon-relay").join("config.toml"))
}

/// Read and parse a config file. A missing file yields the defaults.
pub fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Settings store re-read at the top of every tick.
///
/// Read failures fall back to the last config that parsed, or to the
/// defaults if nothing has parsed yet.
#[derive(Debug)]
pub struct ConfigSource {
    path: Option<PathBuf>,
    last_good: Option<Config>,
}

impl ConfigSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        ConfigSource {
            path,
            last_good: None,
        }
    }

    /// Uses `--config` when given, otherwise the per-user config location.
    pub fn from_cli(path: Option<PathBuf>) -> Self {
        Self::new(path.or_else(config_path))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&mut self) -> Config {
        let Some(path) = self.path.as_deref() else {
            return self.last_good.clone().unwrap_or_default();
        };
        match load_config_from_path(path) {
            Ok(config) => {
                if self.last_good.as_ref() != Some(&config) {
                    tracing::debug!(path = %path.display(), "config loaded");
                }
                self.last_good = Some(config.clone());
                config
            }
            Err(err) => {
                let fallback = if self.last_good.is_some() {
                    "last known good"
                } else {
                    "defaults"
                };
                tracing::warn!(error = %err, fallback, "config read failed");
                self.last_good.clone().unwrap_or_default()
            }
        }
    }
}
