// Host summary and live guest listing models (read from the API, never stored)

use serde::{Deserialize, Serialize};

use super::SnapshotSummary;

/// Raw host status as returned by the API: node detail plus the node's entry in the cluster list.
#[derive(Debug, Clone, Default)]
pub struct NodeStatusPayload {
    pub detail: serde_json::Value,
    pub node_entry: Option<serde_json::Value>,
}

/// Host memory and root filesystem, in bytes. Field names differ from the guest's `MemoryReading`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMemory {
    pub used: Option<f64>,
    pub free: Option<f64>,
    pub total: Option<f64>,
    pub available: Option<f64>,
    pub fs_used: Option<f64>,
    pub fs_total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub node: String,
    pub status: String,
    pub cpu: Option<f64>,
    pub max_cpu: Option<f64>,
    pub memory: HostMemory,
    pub memory_percent: Option<f64>,
    pub uptime_seconds: Option<u64>,
    pub load_avg: Option<Vec<String>>,
    pub version: Option<String>,
}

/// One guest from the live list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestListing {
    /// Id as text; the key stored snapshots are joined on.
    #[serde(skip)]
    pub id: String,
    /// Id exactly as the API reported it (a number for qemu guests).
    #[serde(rename = "id")]
    pub reported_id: serde_json::Value,
    pub name: String,
    pub status: Option<String>,
    pub cpu: Option<f64>,
    pub max_cpu: Option<f64>,
    pub mem: Option<f64>,
    pub max_mem: Option<f64>,
    pub uptime_seconds: Option<u64>,
    pub pid: Option<u64>,
    pub node: Option<String>,
    pub template: bool,
}

/// Live guest plus its most recent stored snapshot, when one exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedGuest {
    #[serde(flatten)]
    pub guest: GuestListing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotSummary>,
}
