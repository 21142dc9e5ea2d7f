//! Tenant and room records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A third-party application embedding the platform.
///
/// The secret is a bearer credential for server-to-server calls; it is
/// echoed exactly once, in the creation response, and never listed
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

/// A call container owned by exactly one tenant for its whole lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: String,
    /// Owning tenant
    pub app_id: String,
    pub name: String,
    /// Seat cap; at least one, default two
    pub max_participants: u32,
    pub created_at: DateTime<Utc>,
}
