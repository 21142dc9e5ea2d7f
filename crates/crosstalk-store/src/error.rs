//! Store error types

use std::fmt;

/// Storage layer errors
#[derive(Debug)]
pub enum StoreError {
    /// Referenced record does not exist
    NotFound,
    /// Presented credentials do not match
    Unauthorized,
    /// Snapshot could not be read or written
    Persistence(String),
    /// IO error
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Persistence(msg) => write!(f, "persistence error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
