//! In-memory presence for the Crosstalk signaling plane
//!
//! One registry instance is constructed at server startup and shared by
//! every signaling session; it is the only shared mutable state in the
//! core. See [`registry::PresenceRegistry`] for the atomicity contract.

pub mod error;
pub mod registry;

pub use error::{AdmitError, DuplicateConnection};
pub use registry::{
    ConnectionId, Departure, Disconnection, Member, PresenceRegistry, DEFAULT_ROOM_CAPACITY,
};
