//! Signaling frames
//!
//! One JSON object per frame, tagged by `type`. Client and server frames
//! are separate sums: the server never parses its own output, and a
//! client frame with a server-only tag is an unknown tag.
//!
//! Relayed negotiation frames (`offer`, `answer`, `ice`) carry the
//! payload verbatim plus a server-stamped `fromUserId`; the sender's own
//! frame never includes one.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::sdp::{IceCandidate, SessionDescription};

/// Frames accepted from clients
///
/// Unknown tags and unexpected fields are both rejected at the parse
/// boundary; the state machine only ever sees well-formed frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum ClientFrame {
    /// Present a grant and request admission to its room
    #[serde(rename_all = "camelCase")]
    Join { room_id: String, token: String },
    /// SDP offer for the other peer
    Offer { sdp: SessionDescription },
    /// SDP answer for the other peer
    Answer { sdp: SessionDescription },
    /// Trickled ICE candidate for the other peer
    Ice { candidate: IceCandidate },
    /// Leave the room and close
    Leave,
}

/// Frames emitted to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    /// Admission succeeded; `peers` lists user-ids already present
    #[serde(rename_all = "camelCase")]
    Joined {
        room_id: String,
        user_id: String,
        peers: Vec<String>,
    },
    /// Another peer was admitted to the room
    ///
    /// `is_initiator` tells the *receiver* whether it produces the first
    /// offer. Existing members are designated initiator so exactly one
    /// side of each pair offers first.
    #[serde(rename_all = "camelCase")]
    PeerJoined { user_id: String, is_initiator: bool },
    /// A peer left or its connection died
    #[serde(rename_all = "camelCase")]
    PeerLeft { user_id: String },
    /// Relayed SDP offer
    #[serde(rename_all = "camelCase")]
    Offer {
        sdp: SessionDescription,
        from_user_id: String,
    },
    /// Relayed SDP answer
    #[serde(rename_all = "camelCase")]
    Answer {
        sdp: SessionDescription,
        from_user_id: String,
    },
    /// Relayed ICE candidate
    #[serde(rename_all = "camelCase")]
    Ice {
        candidate: IceCandidate,
        from_user_id: String,
    },
    /// Error report; fatal codes are followed by a close
    Error { code: ErrorCode, message: String },
}
