//! Tenant and room records backing the Crosstalk access plane
//!
//! The core consumes these through the [`TenantStore`] and [`RoomStore`]
//! traits; any backend satisfying them suffices. Two are provided: a
//! dashmap-backed [`MemoryStore`] (the default) and a [`JsonStore`] that
//! persists a snapshot file across restarts.

pub mod error;
pub mod ids;
pub mod json;
pub mod memory;
pub mod types;

pub use error::StoreError;
pub use json::JsonStore;
pub use memory::MemoryStore;
pub use types::{RoomRecord, Tenant};

use subtle::ConstantTimeEq;

/// Look up and verify a tenant by presented secret.
///
/// The comparison is constant-time, and a missing tenant still performs
/// a comparison against a fixed dummy so the timing profile does not
/// reveal whether the tenant id exists. Both failure modes are
/// `Unauthorized`; callers that need existence use `lookup`.
pub fn verify_presented_secret(
    tenant: Option<Tenant>,
    presented: &str,
) -> Result<Tenant, StoreError> {
    const DUMMY: &[u8] = b"0000000000000000000000000000000000000000000000000000000000000000";
    match tenant {
        Some(tenant) => {
            if tenant.secret.as_bytes().ct_eq(presented.as_bytes()).into() {
                Ok(tenant)
            } else {
                Err(StoreError::Unauthorized)
            }
        }
        None => {
            let _ = DUMMY.ct_eq(presented.as_bytes());
            Err(StoreError::Unauthorized)
        }
    }
}

/// Read access plus creation for tenants
pub trait TenantStore: Send + Sync {
    /// Mint a tenant with a fresh id and secret
    fn create_tenant(&self, name: &str) -> Result<Tenant, StoreError>;

    /// Fetch a tenant by id
    fn lookup(&self, tenant_id: &str) -> Result<Tenant, StoreError>;

    /// Authenticate a `(tenant-id, secret)` pair in constant time
    fn verify_secret(&self, tenant_id: &str, presented: &str) -> Result<Tenant, StoreError>;

    /// All tenants, oldest first
    fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError>;
}

/// Read access plus creation for rooms
pub trait RoomStore: Send + Sync {
    /// Create a room owned by `app_id`
    fn create_room(
        &self,
        app_id: &str,
        name: &str,
        max_participants: u32,
    ) -> Result<RoomRecord, StoreError>;

    /// Fetch a room by id
    fn get_room(&self, room_id: &str) -> Result<RoomRecord, StoreError>;

    /// All rooms owned by `app_id`, oldest first
    fn list_rooms(&self, app_id: &str) -> Result<Vec<RoomRecord>, StoreError>;
}
