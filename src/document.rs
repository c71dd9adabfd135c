//! The published JSON document and its compatibility reader.
//!
//! Current documents (`version` 2.x) wrap the readings as
//! `{stats, appearance, metadata}`. Legacy documents (implied 1.0.0) are the
//! flat `{cpu, memory{total,used,percent}, gpu, warning}` layout some viewers
//! still poll for. Every key is always written; absent readings are `null`.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone};
use semver::Version;
use serde::{Deserialize, Serialize, Serializer};

use crate::appearance::Appearance;
use crate::config::AppearanceConfig;
use crate::error::DocumentError;
use crate::system::snapshot::{CpuStats, GpuStats, MemoryStats, Snapshot, Warnings};

pub const FORMAT_VERSION: &str = "2.0.0";
pub const LEGACY_FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Current,
    Legacy,
}

impl OutputFormat {
    pub fn from_str_config(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "v1" | "flat" => OutputFormat::Legacy,
            _ => OutputFormat::Current,
        }
    }

    pub fn render(self, document: &Document) -> Result<String, serde_json::Error> {
        match self {
            OutputFormat::Current => document.to_json(),
            OutputFormat::Legacy => document.to_legacy_json(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<FixedOffset>,
    pub version: String,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub stats: Snapshot,
    pub appearance: Appearance,
    pub metadata: Metadata,
}

impl Document {
    /// The snapshot's warning is surfaced to the viewer through the metadata.
    pub fn new(stats: Snapshot, appearance: Appearance, timestamp: DateTime<FixedOffset>) -> Self {
        let metadata = Metadata {
            timestamp: timestamp.trunc_subsecs(3),
            version: FORMAT_VERSION.to_string(),
            warning: stats.warning.clone(),
        };
        Document {
            stats,
            appearance,
            metadata,
        }
    }

    pub fn now(stats: Snapshot, appearance: Appearance) -> Self {
        Self::new(stats, appearance, Local::now().fixed_offset())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_legacy_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&LegacyDocument::from_snapshot(&self.stats))
    }
}

fn serialize_timestamp<S>(timestamp: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, false))
}

/// A document read back from either format.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub version: Version,
    pub snapshot: Snapshot,
    pub appearance: Option<Appearance>,
    pub timestamp: Option<DateTime<FixedOffset>>,
}

/// Reads a current or legacy document. The layout decides the format:
/// a top-level `stats` object means current, anything else is legacy.
pub fn parse_document(json: &str) -> Result<ParsedDocument, DocumentError> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    if value.get("stats").is_none() {
        let legacy: LegacyDocument = serde_json::from_value(value)?;
        return Ok(ParsedDocument {
            version: Version::new(1, 0, 0),
            snapshot: legacy.into_snapshot(),
            appearance: None,
            timestamp: None,
        });
    }

    let wire: CurrentWire = serde_json::from_value(value)?;
    let raw_version = wire.metadata.version.as_deref().unwrap_or(FORMAT_VERSION);
    let version = Version::parse(raw_version).map_err(|source| DocumentError::Version {
        version: raw_version.to_string(),
        source,
    })?;
    if version.major != 2 {
        return Err(DocumentError::UnsupportedVersion(version));
    }

    let mut snapshot = wire.stats.sanitized();
    snapshot.warning = wire.metadata.warning;
    Ok(ParsedDocument {
        version,
        snapshot,
        appearance: wire.appearance.as_ref().map(Appearance::from_config),
        timestamp: wire.metadata.timestamp.as_deref().and_then(parse_timestamp),
    })
}

/// RFC 3339, or a naive ISO-8601 local time as older writers produced.
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.fixed_offset())
}

#[derive(Deserialize)]
struct CurrentWire {
    stats: Snapshot,
    #[serde(default)]
    appearance: Option<AppearanceConfig>,
    #[serde(default)]
    metadata: MetadataWire,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct MetadataWire {
    timestamp: Option<String>,
    version: Option<String>,
    warning: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct LegacyDocument {
    cpu: CpuStats,
    memory: LegacyMemory,
    gpu: LegacyGpu,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct LegacyMemory {
    total: f64,
    used: f64,
    percent: f64,
}

#[derive(Serialize, Deserialize)]
struct LegacyGpu {
    #[serde(flatten)]
    stats: GpuStats,
    /// v1 writers replaced the GPU object with `{"error": ...}` on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl LegacyDocument {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        LegacyDocument {
            cpu: snapshot.cpu.clone(),
            memory: LegacyMemory {
                total: snapshot.memory.total_gb,
                used: snapshot.memory.used_gb,
                percent: snapshot.memory.percent,
            },
            gpu: LegacyGpu {
                stats: snapshot.gpu.clone(),
                error: None,
            },
            warning: snapshot.warning.clone(),
        }
    }

    fn into_snapshot(self) -> Snapshot {
        let mut warnings = Warnings::default();
        if let Some(warning) = self.warning {
            warnings.push_message(warning);
        }
        if let Some(error) = self.gpu.error {
            warnings.push_message(format!("GPU unavailable: {error}"));
        }
        Snapshot {
            cpu: self.cpu,
            memory: MemoryStats::new(self.memory.total, self.memory.used, self.memory.percent),
            gpu: self.gpu.stats,
            warning: warnings.into_message(),
        }
        .sanitized()
    }
}
