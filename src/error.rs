// Error taxonomy for the collection pipeline.
// Missing optional fields are never errors; they resolve to defaults where they are read.

/// A poll target that cannot be polled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("poll target is missing a node name")]
    MissingNode,
    #[error("poll target is missing a guest id")]
    MissingGuestId,
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

/// Failure talking to the hypervisor management API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Base URL or API token missing from config; reported at call time, not at startup.
    #[error("hypervisor API is not configured: {0}")]
    NotConfigured(&'static str),

    /// Raw path rejected before any request was made.
    #[error("invalid hypervisor API path: {0}")]
    InvalidPath(String),

    /// Non-success HTTP status from the API.
    #[error("hypervisor API request failed with status {status}")]
    Status { status: u16, body: String },

    /// Transport, TLS, timeout or body decoding failure.
    #[error("hypervisor API transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl UpstreamError {
    /// HTTP status reported by the API, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure reading or writing the snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("snapshot store: SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("snapshot store: raw counter encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("snapshot store: cannot prepare database path: {0}")]
    Io(#[from] std::io::Error),
}

/// Error from one direct poll-extract-persist cycle.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
