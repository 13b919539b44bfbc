use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub poll: PollConfig,

    /// Vendor endpoints to poll each cycle
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Whether the background poll loop runs at all
    #[serde(default = "default_poll_enabled")]
    pub enabled: bool,
    /// Seconds between scheduled collection cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Per-source fetch timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// One polled vendor endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Adapter kind: "uccx" or "cucm"
    pub kind: String,
    /// Optional instance name stamped on records from this source
    #[serde(default)]
    pub name: Option<String>,
    /// Base URL of the vendor API, e.g. "http://10.0.0.5:8001"
    pub base_url: String,
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "data/dialmon.db".to_string()
}

fn default_poll_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            enabled: default_poll_enabled(),
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            database: DatabaseConfig::default(),
            poll: PollConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}
