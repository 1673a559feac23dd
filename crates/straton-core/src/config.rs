use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level client configuration (loaded from straton.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StratonConfig {
    pub client: ClientConfig,
    pub directory: DirectoryConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Local profile directory for the key store
    /// (default: $XDG_CONFIG_HOME/straton)
    pub profile_dir: Option<PathBuf>,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// S3-compatible endpoint serving the directory bucket
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// Bucket holding key records, messages, and attachments
    pub bucket: String,
    /// Enforce HTTPS for the endpoint
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// NATS endpoint for message fan-out
    pub nats_url: String,
    /// Disable to run fetch-only (messages still land in the store)
    pub enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            profile_dir: None,
            log_level: "info".into(),
            log_format: "text".into(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8333".into(),
            region: "us-east-1".into(),
            bucket: "straton".into(),
            enforce_tls: false,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".into(),
            enabled: true,
        }
    }
}

impl StratonConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> crate::StratonResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| crate::StratonError::Config(format!("{}: {e}", path.display())))
    }
}
