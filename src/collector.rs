// Background poller: one Collector per poll target.
// Each tick polls the hypervisor, extracts metrics, and appends a snapshot. A failed tick is
// logged and the schedule keeps going; `collect_once` surfaces the same failures to its caller.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::error::{CollectError, ConfigurationError};
use crate::history_repo::HistoryRepo;
use crate::models::{EntityKey, MetricRecord, Snapshot};
use crate::pve_repo::{HypervisorApi, extract};

/// What to poll and how often. Fixed for the lifetime of a running schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub node: String,
    pub guest_id: String,
    pub interval: Duration,
}

impl PollTarget {
    pub fn new(node: impl Into<String>, guest_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            node: node.into(),
            guest_id: guest_id.into(),
            interval,
        }
    }

    pub fn entity(&self) -> EntityKey {
        EntityKey::new(self.node.clone(), self.guest_id.clone())
    }

    /// Node and guest id must both be set.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.node.trim().is_empty() {
            return Err(ConfigurationError::MissingNode);
        }
        if self.guest_id.trim().is_empty() {
            return Err(ConfigurationError::MissingGuestId);
        }
        Ok(())
    }

    fn validate_schedule(&self) -> Result<(), ConfigurationError> {
        self.validate()?;
        if self.interval.is_zero() {
            return Err(ConfigurationError::ZeroInterval);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStatus {
    Stopped,
    Running,
}

enum State {
    Stopped,
    Running {
        target: PollTarget,
        schedule: JoinHandle<()>,
    },
}

pub struct Collector {
    api: Arc<dyn HypervisorApi>,
    repo: Arc<HistoryRepo>,
    state: Mutex<State>,
}

impl Collector {
    pub fn new(api: Arc<dyn HypervisorApi>, repo: Arc<HistoryRepo>) -> Self {
        Self {
            api,
            repo,
            state: Mutex::new(State::Stopped),
        }
    }

    pub fn status(&self) -> CollectorStatus {
        match *self.lock_state() {
            State::Stopped => CollectorStatus::Stopped,
            State::Running { .. } => CollectorStatus::Running,
        }
    }

    /// Target of the running schedule, if any.
    pub fn running_target(&self) -> Option<PollTarget> {
        match &*self.lock_state() {
            State::Stopped => None,
            State::Running { target, .. } => Some(target.clone()),
        }
    }

    /// Start polling `target`: one poll right away, then one every `target.interval`.
    ///
    /// No-op while already running. An incomplete target is logged and skipped; the collector
    /// stays stopped. Must be called from within a Tokio runtime.
    pub fn start(&self, target: PollTarget) {
        let mut state = self.lock_state();
        if matches!(*state, State::Running { .. }) {
            debug!(node = %target.node, guest_id = %target.guest_id, "collector already running");
            return;
        }
        if let Err(e) = target.validate_schedule() {
            warn!(
                error = %e,
                node = %target.node,
                guest_id = %target.guest_id,
                "polling skipped: target not configured"
            );
            return;
        }

        let schedule = spawn_schedule(self.api.clone(), self.repo.clone(), target.clone());
        info!(
            node = %target.node,
            guest_id = %target.guest_id,
            interval_ms = target.interval.as_millis() as u64,
            "polling started"
        );
        *state = State::Running { target, schedule };
    }

    /// Cancel the schedule. A tick already in flight finishes on its own. Safe when stopped.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), State::Stopped);
        if let State::Running { target, schedule } = previous {
            schedule.abort();
            info!(node = %target.node, guest_id = %target.guest_id, "polling stopped");
        }
    }

    /// One poll-extract-persist cycle, awaited. Errors are returned, not logged.
    pub async fn collect_once(&self, target: &PollTarget) -> Result<MetricRecord, CollectError> {
        collect(self.api.as_ref(), &self.repo, target).await
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if let State::Running { schedule, .. } = &*self.lock_state() {
            schedule.abort();
        }
    }
}

/// The first tick fires immediately. Every tick runs as its own task so a slow upstream call
/// never delays the next fire; overlapping ticks are allowed and may append out of order.
fn spawn_schedule(
    api: Arc<dyn HypervisorApi>,
    repo: Arc<HistoryRepo>,
    target: PollTarget,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(target.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            let api = api.clone();
            let repo = repo.clone();
            let target = target.clone();
            tokio::spawn(async move {
                match collect(api.as_ref(), &repo, &target).await {
                    Ok(metrics) => debug!(
                        node = %target.node,
                        guest_id = %target.guest_id,
                        status = metrics.status.as_deref().unwrap_or("-"),
                        cpu_percent = metrics.cpu_percent,
                        "snapshot collected"
                    ),
                    Err(e) => warn!(
                        error = %e,
                        operation = "collect",
                        node = %target.node,
                        guest_id = %target.guest_id,
                        "polling tick failed"
                    ),
                }
            });
        }
    })
}

async fn collect(
    api: &dyn HypervisorApi,
    repo: &HistoryRepo,
    target: &PollTarget,
) -> Result<MetricRecord, CollectError> {
    target.validate()?;
    let payload = api.guest_status(&target.node, &target.guest_id).await?;
    let metrics = extract::extract_metrics(&payload);
    let snapshot = Snapshot::from_metrics(
        target.entity(),
        chrono::Utc::now().timestamp_millis(),
        metrics.clone(),
        extract::raw_counters(&payload),
    );
    repo.append(&snapshot).await?;
    Ok(metrics)
}
