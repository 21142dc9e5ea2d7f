//! Grant verification errors

use std::fmt;

/// Why a token failed to mint or verify
///
/// The two rejection classes are deliberate: clients retry `Expired` by
/// requesting a fresh grant, while `Invalid` means the token will never
/// verify and the tenant integration is broken.
#[derive(Debug)]
pub enum GrantError {
    /// Expiry is in the past (or exactly now)
    Expired,
    /// Signature, envelope, or claims failed verification
    Invalid(String),
}

impl fmt::Display for GrantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "grant expired"),
            Self::Invalid(msg) => write!(f, "invalid grant: {}", msg),
        }
    }
}

impl std::error::Error for GrantError {}
