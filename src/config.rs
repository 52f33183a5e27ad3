use std::time::Duration;

use serde::Deserialize;

use crate::collector::PollTarget;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub series: SeriesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

/// Hypervisor API access. Empty URL/token are accepted here and reported when a call is made.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub token_id: String,
    #[serde(default)]
    pub token_secret: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Node used when a query or poll target names none.
    #[serde(default)]
    pub default_node: Option<String>,
    /// Guest id used when a query or poll target names none.
    #[serde(default)]
    pub default_guest_id: Option<String>,
}

impl UpstreamConfig {
    /// Trimmed `default_node`, if set and non-blank.
    pub fn default_node(&self) -> Option<&str> {
        non_blank(self.default_node.as_deref())
    }

    /// Trimmed `default_guest_id`, if set and non-blank.
    pub fn default_guest_id(&self) -> Option<&str> {
        non_blank(self.default_guest_id.as_deref())
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Default interval for targets that do not set their own.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            targets: Vec::new(),
        }
    }
}

fn default_interval_ms() -> u64 {
    15_000
}

/// One guest to poll. Blank node or guest id is allowed and makes the collector skip the target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub guest_id: String,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesConfig {
    /// Points per chart series.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
        }
    }
}

fn default_window_size() -> usize {
    20
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Poll targets with the default interval applied. A blank node or guest id falls back to
    /// `upstream.default_node` / `upstream.default_guest_id`. With no `[[polling.targets]]` at all,
    /// those two defaults form the single target (which stays incomplete if either is unset).
    pub fn poll_targets(&self) -> Vec<PollTarget> {
        let default_interval = Duration::from_millis(self.polling.interval_ms);
        if self.polling.targets.is_empty() {
            let node = self.upstream.default_node();
            let guest_id = self.upstream.default_guest_id();
            if node.is_none() && guest_id.is_none() {
                return Vec::new();
            }
            return vec![PollTarget::new(
                node.unwrap_or_default(),
                guest_id.unwrap_or_default(),
                default_interval,
            )];
        }
        self.polling
            .targets
            .iter()
            .map(|t| PollTarget {
                node: non_blank(Some(t.node.as_str()))
                    .or(self.upstream.default_node())
                    .unwrap_or_default()
                    .to_string(),
                guest_id: non_blank(Some(t.guest_id.as_str()))
                    .or(self.upstream.default_guest_id())
                    .unwrap_or_default()
                    .to_string(),
                interval: t
                    .interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(default_interval),
            })
            .collect()
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.upstream.timeout_secs > 0,
            "upstream.timeout_secs must be > 0, got {}",
            self.upstream.timeout_secs
        );
        anyhow::ensure!(
            self.polling.interval_ms > 0,
            "polling.interval_ms must be > 0, got {}",
            self.polling.interval_ms
        );
        for (i, target) in self.polling.targets.iter().enumerate() {
            anyhow::ensure!(
                target.interval_ms != Some(0),
                "polling.targets[{}].interval_ms must be > 0",
                i
            );
        }
        anyhow::ensure!(
            self.series.window_size > 0,
            "series.window_size must be > 0, got {}",
            self.series.window_size
        );
        Ok(())
    }
}
