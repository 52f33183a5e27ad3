// Map raw hypervisor API payloads into our models. Pure functions; missing fields narrow to None.

use serde_json::{Map, Value};

use crate::models::{
    GuestListing, HostMemory, MemoryReading, MetricRecord, NodeStatusPayload, NodeSummary,
    RawCounters,
};
use crate::series::memory::host_memory_percent;

/// Status fields tried in order; the first non-null one wins.
const STATUS_FIELDS: [&str; 5] = [
    "status",
    "qmpstatus",
    "running",
    "running-machine",
    "runningMachine",
];

/// The API wraps results in `{ "data": ... }`; accept either shape.
pub fn unwrap_data(payload: &Value) -> &Value {
    match payload.get("data") {
        Some(inner) if !inner.is_null() => inner,
        _ => payload,
    }
}

/// Guest status payload -> normalized metric record.
pub fn extract_metrics(payload: &Value) -> MetricRecord {
    let data = unwrap_data(payload);
    let Some(fields) = data.as_object() else {
        return MetricRecord::default();
    };

    let cpu_percent = fields
        .get("cpu")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .map(|fraction| round2(fraction * 100.0));

    let status = STATUS_FIELDS
        .iter()
        .find_map(|key| fields.get(*key).and_then(status_text));

    MetricRecord {
        status,
        cpu_percent,
        memory: MemoryReading {
            used: number(fields, "mem"),
            free: number(fields, "freemem"),
            max: number(fields, "maxmem"),
        },
        uptime_seconds: fields.get("uptime").and_then(byte_count),
    }
}

/// Every finite numeric top-level field of the payload.
pub fn raw_counters(payload: &Value) -> RawCounters {
    unwrap_data(payload)
        .as_object()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(k, v)| {
                    v.as_f64()
                        .filter(|n| n.is_finite())
                        .map(|n| (k.clone(), n))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Host status (detail + cluster list entry) -> summary. Cluster list values win where both exist.
pub fn node_summary(node: &str, payload: &NodeStatusPayload) -> NodeSummary {
    let empty = Map::new();
    let detail = object_or_empty(unwrap_data(&payload.detail), &empty);
    let entry = payload
        .node_entry
        .as_ref()
        .map(|e| object_or_empty(e, &empty))
        .unwrap_or(&empty);
    let mem = detail
        .get("memory")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let rootfs = detail
        .get("rootfs")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let memory = HostMemory {
        used: number(mem, "used").or_else(|| number(entry, "mem")),
        free: number(mem, "free").or_else(|| number(mem, "available")),
        total: number(mem, "total").or_else(|| number(entry, "maxmem")),
        available: number(mem, "available"),
        fs_used: number(rootfs, "used").or_else(|| number(entry, "disk")),
        fs_total: number(rootfs, "total").or_else(|| number(entry, "maxdisk")),
    };

    NodeSummary {
        node: text(entry, "node")
            .or_else(|| text(detail, "node"))
            .unwrap_or_else(|| node.to_string()),
        status: text(entry, "status")
            .or_else(|| text(detail, "status"))
            .unwrap_or_else(|| "unknown".to_string()),
        cpu: number(entry, "cpu").or_else(|| number(detail, "cpu")),
        max_cpu: number(entry, "maxcpu")
            .or_else(|| number(detail, "maxcpu"))
            .or_else(|| number(detail, "maxCpu")),
        memory_percent: host_memory_percent(&memory),
        memory,
        uptime_seconds: entry
            .get("uptime")
            .and_then(byte_count)
            .or_else(|| detail.get("uptime").and_then(byte_count)),
        load_avg: detail
            .get("loadavg")
            .or_else(|| entry.get("loadavg"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(status_text).collect()),
        version: text(detail, "pveversion")
            .or_else(|| text(entry, "pveversion"))
            .or_else(|| text(detail, "version")),
    }
}

/// Live guest list payload -> listings. Entries without any id are dropped.
pub fn guest_listing(payload: &Value) -> Vec<GuestListing> {
    let Some(items) = unwrap_data(payload).as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            let (reported_id, id) = ["vmid", "id"].iter().find_map(|key| {
                let v = item.get(*key)?;
                status_text(v).map(|s| (v.clone(), s))
            })?;
            Some(GuestListing {
                reported_id,
                name: text(item, "name").unwrap_or_else(|| id.clone()),
                status: text(item, "status"),
                cpu: number(item, "cpu"),
                max_cpu: number(item, "maxcpu"),
                mem: number(item, "mem"),
                max_mem: number(item, "maxmem"),
                uptime_seconds: item.get("uptime").and_then(byte_count),
                pid: item.get("pid").and_then(byte_count),
                node: text(item, "node"),
                template: item.get("template").is_some_and(truthy),
                id,
            })
        })
        .collect()
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn object_or_empty<'a>(v: &'a Value, empty: &'a Map<String, Value>) -> &'a Map<String, Value> {
    v.as_object().unwrap_or(empty)
}

/// Strings pass through; booleans and numbers render as text; null and containers are absent.
fn status_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative whole number (bytes, seconds, pids). Fractions are truncated.
fn byte_count(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u64)
    })
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        _ => true,
    }
}
