// Shared test helpers
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use guestwatch::error::UpstreamError;
use guestwatch::history_repo::HistoryRepo;
use guestwatch::models::*;
use guestwatch::pve_repo::{HypervisorApi, split_api_path};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const NODE: &str = "pve";
pub const GUEST: &str = "100";

/// Fresh, initialized store in a temp dir. Keep the `TempDir` alive for the test's duration.
pub async fn temp_repo() -> (TempDir, HistoryRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("snapshots.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

pub fn snapshot(collected_at: i64) -> Snapshot {
    Snapshot {
        entity: EntityKey::new(NODE, GUEST),
        collected_at,
        status: Some("running".into()),
        cpu_percent: None,
        memory: MemoryReading::default(),
        uptime_seconds: None,
        raw: RawCounters::new(),
    }
}

pub fn with_cpu(mut s: Snapshot, cpu: f64) -> Snapshot {
    s.cpu_percent = Some(cpu);
    s
}

pub fn with_memory(
    mut s: Snapshot,
    used: Option<f64>,
    free: Option<f64>,
    max: Option<f64>,
) -> Snapshot {
    s.memory = MemoryReading { used, free, max };
    s
}

pub fn with_raw(mut s: Snapshot, pairs: &[(&str, f64)]) -> Snapshot {
    for (k, v) in pairs {
        s.raw.insert((*k).to_string(), *v);
    }
    s
}

pub fn guest_payload() -> Value {
    json!({
        "data": {
            "status": "running",
            "cpu": 0.1234,
            "mem": 536870912u64,
            "maxmem": 1073741824u64,
            "uptime": 3600,
            "netin": 1000,
            "netout": 2000,
            "diskread": 4096,
            "diskwrite": 8192,
            "name": "web-01"
        }
    })
}

/// In-memory `HypervisorApi`. Guest status fails while `fail` is set.
pub struct FakeApi {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    pub guest: Mutex<Value>,
    pub node: NodeStatusPayload,
    pub guests: Value,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            guest: Mutex::new(guest_payload()),
            node: NodeStatusPayload::default(),
            guests: json!({ "data": [] }),
        }
    }

    pub fn failing() -> Self {
        let api = Self::new();
        api.fail.store(true, Ordering::SeqCst);
        api
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HypervisorApi for FakeApi {
    async fn guest_status(&self, _node: &str, _guest_id: &str) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.guest.lock().unwrap().clone())
    }

    async fn node_status(&self, _node: &str) -> Result<NodeStatusPayload, UpstreamError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: 502,
                body: String::new(),
            });
        }
        Ok(self.node.clone())
    }

    async fn node_guests(&self, _node: &str) -> Result<Value, UpstreamError> {
        Ok(self.guests.clone())
    }

    async fn raw_get(&self, path: &str) -> Result<Value, UpstreamError> {
        let (segments, query) = split_api_path(path)?;
        Ok(json!({ "data": { "segments": segments, "query": query } }))
    }
}
