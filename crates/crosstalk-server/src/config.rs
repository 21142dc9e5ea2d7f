//! Server configuration
//!
//! Values come from three layers: built-in defaults, an optional TOML
//! file, and CLI flags / `CROSSTALK_*` environment variables (which win).
//! The binary assembles the layers; this module owns the shape and the
//! validation rules.

use std::path::{Path, PathBuf};

use crosstalk_grant::parse_ttl;
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host for both listeners
    pub host: String,
    /// REST access-plane port
    pub api_port: u16,
    /// WebSocket signaling port
    pub signaling_port: u16,
    /// Store snapshot path; unset means the in-memory store
    pub store_path: Option<PathBuf>,
    /// Shared grant signing secret. Required in production; in
    /// development an ephemeral secret is generated at startup.
    pub signing_secret: Option<String>,
    /// Grant lifetime used when a token request names none
    pub default_ttl: String,
    /// Liveness ping interval in seconds
    pub heartbeat_secs: u64,
    /// REST rate limit, requests per second per IP
    pub rate_limit: u32,
    /// Refuse to start without a signing secret
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            api_port: 3000,
            signaling_port: 3001,
            store_path: None,
            signing_secret: None,
            default_ttl: "1h".to_string(),
            heartbeat_secs: 30,
            rate_limit: 100,
            production: false,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file; absent keys fall back to defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate and clamp configuration values
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.production && self.signing_secret.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingSigningSecret);
        }
        if parse_ttl(&self.default_ttl).is_err() {
            return Err(ConfigError::InvalidDefaultTtl(self.default_ttl.clone()));
        }
        if self.heartbeat_secs == 0 {
            tracing::warn!("heartbeat interval of 0 clamped to 1s");
            self.heartbeat_secs = 1;
        }
        if self.rate_limit == 0 {
            self.rate_limit = 1;
        }
        Ok(())
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.host, self.api_port)
    }

    pub fn signaling_addr(&self) -> String {
        format!("{}:{}", self.host, self.signaling_port)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("signing secret is required in production")]
    MissingSigningSecret,
    #[error("invalid default ttl {0:?}")]
    InvalidDefaultTtl(String),
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
