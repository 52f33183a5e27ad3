// Read-only HTTP query surface over the snapshot store and the hypervisor API

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::history_repo::HistoryRepo;
use crate::pve_repo::HypervisorApi;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: Arc<dyn HypervisorApi>,
    pub(crate) repo: Arc<HistoryRepo>,
    pub(crate) config: AppConfig,
}

pub fn app(api: Arc<dyn HypervisorApi>, repo: Arc<HistoryRepo>, config: AppConfig) -> Router {
    let state = AppState { api, repo, config };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/vm-status", get(http::vm_status)) // GET /api/vm-status
        .route("/api/proxy", get(http::proxy)) // GET /api/proxy
        .route("/api/snapshots/latest", get(http::latest_snapshot)) // GET /api/snapshots/latest
        .route("/api/snapshots", get(http::list_snapshots)) // GET /api/snapshots
        .route("/api/series", get(http::snapshot_series)) // GET /api/series
        .route("/api/node-summary", get(http::node_summary)) // GET /api/node-summary
        .route("/api/vms", get(http::node_vms)) // GET /api/vms
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
