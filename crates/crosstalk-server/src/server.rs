//! Listener wiring and lifecycle
//!
//! Two listeners share one `AppState`: the REST access plane and the
//! WebSocket signaling plane. On a termination signal both stop
//! accepting, in-flight work gets a bounded drain window, then whatever
//! remains is closed. Clients treat an abrupt close as transient and
//! reconnect on their own schedule, so no farewell is broadcast.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api;
use crate::config::ServerConfig;
use crate::signaling;
use crate::state::AppState;

/// How long in-flight connections get to drain after a shutdown signal
const DRAIN_GRACE: Duration = Duration::from_secs(10);

/// Both listeners, bound but not yet serving
pub struct Server {
    api_listener: TcpListener,
    signaling_listener: TcpListener,
    api_addr: SocketAddr,
    signaling_addr: SocketAddr,
    state: AppState,
}

impl Server {
    /// Bind both listeners. Port 0 binds an ephemeral port, which the
    /// address accessors report; tests lean on that.
    pub async fn bind(config: &ServerConfig, state: AppState) -> anyhow::Result<Self> {
        let api_listener = TcpListener::bind(config.api_addr())
            .await
            .with_context(|| format!("bind API listener on {}", config.api_addr()))?;
        let signaling_listener = TcpListener::bind(config.signaling_addr())
            .await
            .with_context(|| format!("bind signaling listener on {}", config.signaling_addr()))?;
        let api_addr = api_listener.local_addr()?;
        let signaling_addr = signaling_listener.local_addr()?;
        Ok(Self {
            api_listener,
            signaling_listener,
            api_addr,
            signaling_addr,
            state,
        })
    }

    pub fn api_addr(&self) -> SocketAddr {
        self.api_addr
    }

    pub fn signaling_addr(&self) -> SocketAddr {
        self.signaling_addr
    }

    /// Serve until `shutdown` resolves, then drain and exit.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
        let mut api_stop = stop_rx.clone();
        let mut signaling_stop = stop_rx;

        let api_router = api::router(self.state.clone());
        let mut api_task = tokio::spawn(async move {
            axum::serve(
                self.api_listener,
                api_router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = api_stop.changed().await;
            })
            .await
        });

        let signaling_router = signaling::router(self.state.clone());
        let mut signaling_task = tokio::spawn(async move {
            axum::serve(
                self.signaling_listener,
                signaling_router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = signaling_stop.changed().await;
            })
            .await
        });

        info!(api = %self.api_addr, signaling = %self.signaling_addr, "listening");

        tokio::select! {
            _ = shutdown => {
                info!("shutdown signal received, draining");
                let _ = stop_tx.send(true);
                tokio::select! {
                    _ = futures::future::join(&mut api_task, &mut signaling_task) => {}
                    _ = tokio::time::sleep(DRAIN_GRACE) => {
                        warn!("drain grace elapsed, closing remaining connections");
                        api_task.abort();
                        signaling_task.abort();
                    }
                }
                Ok(())
            }
            result = futures::future::join(&mut api_task, &mut signaling_task) => {
                let (api_result, signaling_result) = result;
                api_result.context("API listener task")??;
                signaling_result.context("signaling listener task")??;
                Ok(())
            }
        }
    }
}

/// Resolve when the process is asked to stop (SIGINT, and SIGTERM on
/// unix). If signal handlers cannot be installed the server just runs
/// until killed.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                warn!(%err, "cannot install SIGTERM handler");
                return std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(%err, "cannot listen for ctrl-c");
                    return std::future::pending::<()>().await;
                }
            }
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "cannot listen for ctrl-c");
            return std::future::pending::<()>().await;
        }
    }
}
