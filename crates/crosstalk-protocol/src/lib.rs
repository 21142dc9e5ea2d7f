//! Wire protocol for the Crosstalk signaling plane
//!
//! Defines the closed set of frames exchanged between clients and the
//! signaling endpoint, the WebRTC negotiation payload shapes they carry,
//! the participant roles, and the stable error codes clients match on.
//!
//! Frames are one JSON object each, internally tagged by a `type` field.
//! The parser rejects unknown tags and unexpected fields at the
//! boundary; the state machine never sees an unclassified message.

pub mod error;
pub mod frames;
pub mod role;
pub mod sdp;

pub use error::ErrorCode;
pub use frames::{ClientFrame, ServerFrame};
pub use role::Role;
pub use sdp::{IceCandidate, SdpType, SessionDescription};
