//! Registry operation errors

use std::fmt;

/// Why an admission was refused
///
/// `TenantMismatch` outranks `RoomFull` when both apply: a credential
/// problem must not be masked as a capacity problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitError {
    /// No peer record exists for the connection (registration was skipped)
    NoSuchConnection,
    /// The connection is already admitted to a room
    AlreadyAdmitted,
    /// The room is pinned to a different tenant
    TenantMismatch,
    /// The room is at its participant cap
    RoomFull,
}

impl fmt::Display for AdmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchConnection => write!(f, "no peer record for connection"),
            Self::AlreadyAdmitted => write!(f, "connection already admitted to a room"),
            Self::TenantMismatch => write!(f, "room belongs to a different tenant"),
            Self::RoomFull => write!(f, "room is full"),
        }
    }
}

impl std::error::Error for AdmitError {}

/// Registering the same connection twice is a programming error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateConnection;

impl fmt::Display for DuplicateConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection already registered")
    }
}

impl std::error::Error for DuplicateConnection {}
