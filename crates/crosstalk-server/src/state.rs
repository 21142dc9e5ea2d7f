//! Shared server state
//!
//! Everything the handlers need, built once at startup and cloned into
//! each listener. The presence registry is an explicit collaborator
//! rather than a global so parallel test servers stay isolated.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use crosstalk_grant::{parse_ttl, GrantSigner};
use crosstalk_presence::PresenceRegistry;
use crosstalk_store::{ids, JsonStore, MemoryStore, RoomStore, TenantStore};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::signaling::Outbound;

/// Handles shared by the REST and signaling planes
#[derive(Clone)]
pub struct AppState {
    pub tenants: Arc<dyn TenantStore>,
    pub rooms: Arc<dyn RoomStore>,
    pub registry: Arc<PresenceRegistry<Outbound>>,
    pub signer: Arc<GrantSigner>,
    pub limiter: Arc<Mutex<RateLimiter>>,
    pub default_ttl: Duration,
    pub heartbeat: Duration,
}

impl AppState {
    /// Build state from a validated configuration
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let tenants: Arc<dyn TenantStore>;
        let rooms: Arc<dyn RoomStore>;
        match &config.store_path {
            Some(path) => {
                let store = Arc::new(
                    JsonStore::open(path)
                        .with_context(|| format!("open store {}", path.display()))?,
                );
                info!(path = %path.display(), "using JSON store");
                tenants = store.clone();
                rooms = store;
            }
            None => {
                let store = Arc::new(MemoryStore::new());
                tenants = store.clone();
                rooms = store;
            }
        }

        let secret = match config.signing_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret.to_string(),
            _ => {
                warn!("no signing secret configured; using an ephemeral one (grants will not survive a restart)");
                ids::generate_secret()
            }
        };

        let default_ttl = parse_ttl(&config.default_ttl)
            .map_err(|e| anyhow::anyhow!("default ttl: {}", e))?;

        Ok(Self {
            tenants,
            rooms,
            registry: Arc::new(PresenceRegistry::new()),
            signer: Arc::new(GrantSigner::new(secret.as_bytes())),
            limiter: Arc::new(Mutex::new(RateLimiter::new(config.rate_limit))),
            default_ttl,
            heartbeat: Duration::from_secs(config.heartbeat_secs),
        })
    }
}
