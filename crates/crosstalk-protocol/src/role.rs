//! Participant roles

use serde::{Deserialize, Serialize};

/// Role a grant authorizes within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Call owner (typically the tenant's primary user)
    Host,
    /// Full participant
    Participant,
    /// Receive-only observer
    Viewer,
}

impl Role {
    /// Stable wire string for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Participant => "participant",
            Role::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
