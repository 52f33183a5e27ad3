// GET handlers. Responses use `{ "result": <status>, "data" | "error": ... }`.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::AppState;
use crate::error::{PersistenceError, UpstreamError};
use crate::models::{EnrichedGuest, EntityKey, SnapshotSummary};
use crate::pve_repo::extract;
use crate::series::{self, MAX_WINDOW_SIZE};
use crate::version::{NAME, VERSION};

#[derive(Debug, Serialize)]
struct Envelope<T> {
    result: u16,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope { result: 200, data }).into_response()
}

pub(super) enum ApiError {
    BadRequest(&'static str),
    NotFound(&'static str),
    Upstream(UpstreamError),
    Persistence(PersistenceError),
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        Self::Upstream(e)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string(), None),
            Self::Upstream(e) => {
                tracing::warn!(error = %e, "hypervisor API request failed");
                let status = match &e {
                    UpstreamError::InvalidPath(_) => StatusCode::BAD_REQUEST,
                    _ => e
                        .status()
                        .and_then(|s| StatusCode::from_u16(s).ok())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                };
                let details = match &e {
                    UpstreamError::Status { body, .. } if !body.is_empty() => Some(body.clone()),
                    _ => None,
                };
                (status, e.to_string(), details)
            }
            Self::Persistence(e) => {
                tracing::warn!(error = %e, "snapshot store query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
            }
        };
        let mut body = serde_json::json!({ "result": status.as_u16(), "error": error });
        if let Some(details) = details {
            body["details"] = serde_json::Value::String(details);
        }
        (status, Json(body)).into_response()
    }
}

/// Counts stay strings so a malformed value falls back to the default instead of failing
/// extraction outside the response envelope.
#[derive(Debug, Deserialize)]
pub(super) struct SnapshotQuery {
    node: Option<String>,
    vmid: Option<String>,
    limit: Option<String>,
    window: Option<String>,
}

impl SnapshotQuery {
    fn entity(&self) -> Result<EntityKey, ApiError> {
        match (non_blank(&self.node), non_blank(&self.vmid)) {
            (Some(node), Some(vmid)) => Ok(EntityKey::new(node, vmid)),
            _ => Err(ApiError::BadRequest(
                "Query parameters 'node' and 'vmid' are required.",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct NodeQuery {
    node: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProxyQuery {
    path: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Positive count, or `None` when absent, malformed, negative or zero.
fn parse_count<T: FromStr + PartialOrd + Default>(v: &Option<String>) -> Option<T> {
    non_blank(v)
        .and_then(|s| s.parse::<T>().ok())
        .filter(|n| *n > T::default())
}

fn resolve_node(state: &AppState, q: &NodeQuery) -> Result<String, ApiError> {
    non_blank(&q.node)
        .or_else(|| state.config.upstream.default_node())
        .map(str::to_string)
        .ok_or(ApiError::BadRequest(
            "Node is required. Provide ?node= or set upstream.default_node.",
        ))
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/vm-status?node&vmid: live guest status passthrough; both fall back to the
/// configured defaults.
pub(super) async fn vm_status(
    State(state): State<AppState>,
    Query(q): Query<SnapshotQuery>,
) -> Result<Response, ApiError> {
    let upstream = &state.config.upstream;
    let (Some(node), Some(vmid)) = (
        non_blank(&q.node).or_else(|| upstream.default_node()),
        non_blank(&q.vmid).or_else(|| upstream.default_guest_id()),
    ) else {
        return Err(ApiError::BadRequest(
            "Node and VMID are required. Provide them in the request or set upstream.default_node and upstream.default_guest_id.",
        ));
    };
    Ok(ok(state.api.guest_status(node, vmid).await?))
}

/// GET /api/proxy?path: raw read-only GET of a path below the API base URL.
pub(super) async fn proxy(
    State(state): State<AppState>,
    Query(q): Query<ProxyQuery>,
) -> Result<Response, ApiError> {
    let Some(path) = non_blank(&q.path) else {
        return Err(ApiError::BadRequest("Query parameter 'path' is required."));
    };
    Ok(ok(state.api.raw_get(path).await?))
}

/// GET /api/snapshots/latest?node&vmid
pub(super) async fn latest_snapshot(
    State(state): State<AppState>,
    Query(q): Query<SnapshotQuery>,
) -> Result<Response, ApiError> {
    let entity = q.entity()?;
    match state.repo.latest(&entity).await? {
        Some(snapshot) => Ok(ok(snapshot)),
        None => Err(ApiError::NotFound(
            "No snapshots found for the specified node/vmid.",
        )),
    }
}

/// GET /api/snapshots?node&vmid&limit: newest first, default 50, at most 500.
pub(super) async fn list_snapshots(
    State(state): State<AppState>,
    Query(q): Query<SnapshotQuery>,
) -> Result<Response, ApiError> {
    let entity = q.entity()?;
    let snapshots = state.repo.list(&entity, parse_count(&q.limit)).await?;
    Ok(ok(snapshots))
}

/// GET /api/series?node&vmid&window: one extra snapshot is read so the oldest charted point
/// has a rate.
pub(super) async fn snapshot_series(
    State(state): State<AppState>,
    Query(q): Query<SnapshotQuery>,
) -> Result<Response, ApiError> {
    let entity = q.entity()?;
    let window = parse_count(&q.window)
        .unwrap_or(state.config.series.window_size)
        .min(MAX_WINDOW_SIZE);
    let snapshots = state.repo.list(&entity, Some(window as u32 + 1)).await?;
    Ok(ok(series::aggregate(&snapshots, window)))
}

/// GET /api/node-summary?node
pub(super) async fn node_summary(
    State(state): State<AppState>,
    Query(q): Query<NodeQuery>,
) -> Result<Response, ApiError> {
    let node = resolve_node(&state, &q)?;
    let payload = state.api.node_status(&node).await?;
    Ok(ok(extract::node_summary(&node, &payload)))
}

/// GET /api/vms?node: live guest list, each enriched with its latest stored snapshot.
pub(super) async fn node_vms(
    State(state): State<AppState>,
    Query(q): Query<NodeQuery>,
) -> Result<Response, ApiError> {
    let node = resolve_node(&state, &q)?;
    let guests = extract::guest_listing(&state.api.node_guests(&node).await?);
    let ids: Vec<String> = guests.iter().map(|g| g.id.clone()).collect();
    let mut latest = state.repo.latest_for_many(&ids, Some(node.as_str())).await?;

    let enriched: Vec<EnrichedGuest> = guests
        .into_iter()
        .map(|guest| {
            let snapshot = latest.remove(&guest.id).as_ref().map(SnapshotSummary::from);
            EnrichedGuest { guest, snapshot }
        })
        .collect();
    Ok(ok(enriched))
}
