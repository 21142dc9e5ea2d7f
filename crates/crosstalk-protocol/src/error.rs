//! Stable signaling error codes
//!
//! A closed set: clients branch on the code string, so codes never change
//! once shipped. Fatal codes are followed by a transport close; the
//! remainder leave the connection open.

use serde::{Deserialize, Serialize};

/// Error codes carried by `error` frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Frame could not be parsed or carried an unknown tag
    InvalidMessage,
    /// Grant signature or claims failed verification
    InvalidToken,
    /// Grant expiry is in the past
    TokenExpired,
    /// Grant or room belongs to a different tenant
    TenantMismatch,
    /// Room is at its participant cap
    RoomFull,
    /// Connection is already admitted to a room
    AlreadyInRoom,
    /// Negotiation frame sent before admission
    NotInRoom,
    /// Unexpected server fault
    InternalError,
}

impl ErrorCode {
    /// Stable wire string for this code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TenantMismatch => "TENANT_MISMATCH",
            ErrorCode::RoomFull => "ROOM_FULL",
            ErrorCode::AlreadyInRoom => "ALREADY_IN_ROOM",
            ErrorCode::NotInRoom => "NOT_IN_ROOM",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the endpoint closes the transport after reporting this code.
    ///
    /// `InvalidMessage` is fatal only before admission; an admitted
    /// connection gets the error reported and stays open. The endpoint
    /// supplies the admission state.
    pub fn is_fatal(&self, admitted: bool) -> bool {
        match self {
            ErrorCode::InvalidToken
            | ErrorCode::TokenExpired
            | ErrorCode::TenantMismatch
            | ErrorCode::RoomFull
            | ErrorCode::InternalError => true,
            ErrorCode::InvalidMessage => !admitted,
            ErrorCode::AlreadyInRoom | ErrorCode::NotInRoom => false,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
