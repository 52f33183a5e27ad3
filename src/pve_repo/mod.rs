// Hypervisor management API via reqwest (API-token auth, JSON responses)

pub mod extract;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::instrument;

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use crate::models::NodeStatusPayload;

/// The calls this service makes against the hypervisor. One GET-style call per operation
/// (`node_status` issues two concurrently).
#[async_trait]
pub trait HypervisorApi: Send + Sync {
    /// Current status of one guest, as returned (still wrapped in `data`).
    async fn guest_status(&self, node: &str, guest_id: &str) -> Result<Value, UpstreamError>;

    /// Node detail plus the node's entry in the cluster node list.
    async fn node_status(&self, node: &str) -> Result<NodeStatusPayload, UpstreamError>;

    /// Live guest list of one node.
    async fn node_guests(&self, node: &str) -> Result<Value, UpstreamError>;

    /// GET an arbitrary read path below the API base, e.g. `cluster/resources?type=vm`.
    async fn raw_get(&self, path: &str) -> Result<Value, UpstreamError>;
}

/// Split a relative API path into segments plus an optional query string.
///
/// Absolute URLs, empty paths and `.`/`..` segments are rejected so a caller can never leave
/// the configured base URL.
pub fn split_api_path(path: &str) -> Result<(Vec<&str>, Option<&str>), UpstreamError> {
    let invalid = || UpstreamError::InvalidPath(path.to_string());
    let (path_part, query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q).filter(|q| !q.is_empty())),
        None => (path, None),
    };
    if path_part.contains("://") || path_part.contains('\\') {
        return Err(invalid());
    }
    let segments: Vec<&str> = path_part.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(invalid());
    }
    Ok((segments, query))
}

pub struct PveRepo {
    client: Client,
    base_url: String,
    token_id: String,
    token_secret: String,
}

impl PveRepo {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(crate::version::user_agent())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            token_id: config.token_id.trim().to_string(),
            token_secret: config.token_secret.trim().to_string(),
        })
    }

    fn auth_header(&self) -> Result<String, UpstreamError> {
        if self.token_id.is_empty() || self.token_secret.is_empty() {
            return Err(UpstreamError::NotConfigured("token_id and token_secret"));
        }
        Ok(format!("PVEAPIToken={}={}", self.token_id, self.token_secret))
    }

    /// Base URL plus path segments; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        if self.base_url.is_empty() {
            return Err(UpstreamError::NotConfigured("base_url"));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|_| UpstreamError::NotConfigured("base_url (not a valid URL)"))?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::NotConfigured("base_url (not a base URL)"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> Result<Value, UpstreamError> {
        self.get_with_query(segments, None).await
    }

    #[instrument(skip(self), fields(repo = "pve", operation = "get"))]
    async fn get_with_query(
        &self,
        segments: &[&str],
        query: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let mut url = self.endpoint(segments)?;
        url.set_query(query);
        let auth = self.auth_header()?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, auth)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl HypervisorApi for PveRepo {
    async fn guest_status(&self, node: &str, guest_id: &str) -> Result<Value, UpstreamError> {
        self.get(&["nodes", node, "qemu", guest_id, "status", "current"])
            .await
    }

    async fn node_status(&self, node: &str) -> Result<NodeStatusPayload, UpstreamError> {
        let detail_path = ["nodes", node, "status"];
        let list_path = ["nodes"];
        let (detail, nodes) = tokio::try_join!(self.get(&detail_path), self.get(&list_path))?;
        let node_entry = extract::unwrap_data(&nodes)
            .as_array()
            .and_then(|list| {
                list.iter()
                    .find(|item| item.get("node").and_then(Value::as_str) == Some(node))
            })
            .cloned();
        Ok(NodeStatusPayload { detail, node_entry })
    }

    async fn node_guests(&self, node: &str) -> Result<Value, UpstreamError> {
        self.get(&["nodes", node, "qemu"]).await
    }

    async fn raw_get(&self, path: &str) -> Result<Value, UpstreamError> {
        let (segments, query) = split_api_path(path)?;
        self.get_with_query(&segments, query).await
    }
}
