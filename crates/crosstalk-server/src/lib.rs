//! Crosstalk server
//!
//! Hosts the two planes of the platform: the REST access plane (tenant
//! bookkeeping and grant issuance) and the WebSocket signaling plane
//! (admission, presence, and SDP/ICE relay). Media never touches this
//! process; it only brokers the negotiation that lets peers connect
//! directly.

pub mod api;
pub mod config;
pub mod rate_limit;
pub mod server;
pub mod signaling;
pub mod state;

pub use config::ServerConfig;
pub use server::{shutdown_signal, Server};
pub use state::AppState;
