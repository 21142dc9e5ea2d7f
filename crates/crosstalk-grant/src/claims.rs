//! Grant claims

use crosstalk_protocol::Role;
use serde::{Deserialize, Serialize};

use crate::error::GrantError;

/// Maximum accepted user-id length in bytes
pub const MAX_USER_ID_LEN: usize = 255;

/// The claim set carried inside a grant token
///
/// `jti` individually identifies the grant so a future revocation list
/// can veto it without rotating the signing key. Timestamps are unix
/// seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantClaims {
    /// Grant id (128-bit random, hex)
    pub jti: String,
    /// Owning tenant id
    pub app_id: String,
    /// Room the grant admits to
    pub room_id: String,
    /// User identity asserted by the tenant
    pub user_id: String,
    /// Authorized role
    pub role: Role,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expires-at, unix seconds
    pub exp: i64,
}

impl GrantClaims {
    /// Check claim well-formedness (signature and expiry are checked by
    /// the verifier, not here).
    pub fn validate(&self) -> Result<(), GrantError> {
        if self.jti.is_empty() {
            return Err(GrantError::Invalid("empty jti".to_string()));
        }
        if self.app_id.is_empty() {
            return Err(GrantError::Invalid("empty appId".to_string()));
        }
        if self.room_id.is_empty() {
            return Err(GrantError::Invalid("empty roomId".to_string()));
        }
        if self.user_id.is_empty() {
            return Err(GrantError::Invalid("empty userId".to_string()));
        }
        if self.user_id.len() > MAX_USER_ID_LEN {
            return Err(GrantError::Invalid("userId too long".to_string()));
        }
        if self.exp <= self.iat {
            return Err(GrantError::Invalid("exp not after iat".to_string()));
        }
        Ok(())
    }
}
