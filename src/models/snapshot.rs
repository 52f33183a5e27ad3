// Snapshot records and the metric record extracted from one upstream status payload

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Numeric upstream fields kept beside the normalized ones (cumulative counters live here).
pub type RawCounters = BTreeMap<String, f64>;

/// A monitored guest: node name plus guest id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    pub node: String,
    pub guest_id: String,
}

impl EntityKey {
    pub fn new(node: impl Into<String>, guest_id: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            guest_id: guest_id.into(),
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.node, self.guest_id)
    }
}

/// Guest memory in bytes, each field exactly as reported (or not) by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub used: Option<f64>,
    pub free: Option<f64>,
    pub max: Option<f64>,
}

/// Normalized metrics for one poll. Every field is optional; extraction never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub status: Option<String>,
    pub cpu_percent: Option<f64>,
    pub memory: MemoryReading,
    pub uptime_seconds: Option<u64>,
}

/// One immutable, timestamped record of a guest. Never updated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub entity: EntityKey,
    /// Unix epoch milliseconds.
    pub collected_at: i64,
    pub status: Option<String>,
    /// May exceed 100 transiently; stored as reported.
    pub cpu_percent: Option<f64>,
    pub memory: MemoryReading,
    pub uptime_seconds: Option<u64>,
    #[serde(default)]
    pub raw: RawCounters,
}

impl Snapshot {
    pub fn from_metrics(
        entity: EntityKey,
        collected_at: i64,
        metrics: MetricRecord,
        raw: RawCounters,
    ) -> Self {
        Self {
            entity,
            collected_at,
            status: metrics.status,
            cpu_percent: metrics.cpu_percent,
            memory: metrics.memory,
            uptime_seconds: metrics.uptime_seconds,
            raw,
        }
    }

    /// Value of one raw upstream field, if present and finite.
    pub fn raw_value(&self, key: &str) -> Option<f64> {
        self.raw.get(key).copied().filter(|v| v.is_finite())
    }
}

/// Latest-snapshot digest attached to a live guest listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub collected_at: i64,
    pub cpu_percent: Option<f64>,
    pub memory_used: Option<f64>,
    pub memory_max: Option<f64>,
    pub memory_percent: Option<f64>,
}

impl From<&Snapshot> for SnapshotSummary {
    /// Memory percent here is `used / max` only, rounded to 2 decimals; no free-based fallback.
    fn from(s: &Snapshot) -> Self {
        let memory_percent = match (s.memory.used, s.memory.max) {
            (Some(used), Some(max)) if max > 0.0 => Some((used / max * 10_000.0).round() / 100.0),
            _ => None,
        };
        Self {
            collected_at: s.collected_at,
            cpu_percent: s.cpu_percent,
            memory_used: s.memory.used,
            memory_max: s.memory.max,
            memory_percent,
        }
    }
}
