use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// A single metric source could not be read. Never fatal to a tick.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("{metric} unavailable: {reason}")]
    Unavailable { metric: &'static str, reason: String },

    #[error("{metric} unavailable - run with sudo")]
    PrivilegeRequired { metric: &'static str },
}

impl MetricError {
    pub fn unavailable(metric: &'static str, reason: impl Into<String>) -> Self {
        MetricError::Unavailable {
            metric,
            reason: reason.into(),
        }
    }

    /// Map an I/O failure on a sysfs node to the matching variant.
    pub fn from_io(metric: &'static str, path: &std::path::Path, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => MetricError::PrivilegeRequired { metric },
            io::ErrorKind::NotFound => {
                MetricError::unavailable(metric, format!("{} not found", path.display()))
            }
            _ => MetricError::unavailable(metric, format!("{}: {err}", path.display())),
        }
    }

    pub fn metric(&self) -> &'static str {
        match self {
            MetricError::Unavailable { metric, .. } | MetricError::PrivilegeRequired { metric } => {
                metric
            }
        }
    }
}

/// An external program (bridge tool, vendor CLI) did not complete.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` timed out after {}ms", .timeout.as_millis())]
    Timeout { program: String, timeout: Duration },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to stage document: {0}")]
    Stage(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid format version `{version}`: {source}")]
    Version {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("unsupported format version {0}")]
    UnsupportedVersion(semver::Version),
}
