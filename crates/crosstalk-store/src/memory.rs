//! In-memory store backend

use chrono::Utc;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::ids;
use crate::types::{RoomRecord, Tenant};
use crate::{verify_presented_secret, RoomStore, TenantStore};

/// Dashmap-backed store; the default when no store path is configured.
///
/// State lives only as long as the process, which is the right trade for
/// development and tests; rooms and tenants are cheap to recreate.
#[derive(Default)]
pub struct MemoryStore {
    tenants: DashMap<String, Tenant>,
    rooms: DashMap<String, RoomRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenantStore for MemoryStore {
    fn create_tenant(&self, name: &str) -> Result<Tenant, StoreError> {
        let tenant = Tenant {
            id: ids::generate_id(),
            name: name.to_string(),
            secret: ids::generate_secret(),
            created_at: Utc::now(),
        };
        self.tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(tenant)
    }

    fn lookup(&self, tenant_id: &str) -> Result<Tenant, StoreError> {
        self.tenants
            .get(tenant_id)
            .map(|t| t.clone())
            .ok_or(StoreError::NotFound)
    }

    fn verify_secret(&self, tenant_id: &str, presented: &str) -> Result<Tenant, StoreError> {
        let tenant = self.tenants.get(tenant_id).map(|t| t.clone());
        verify_presented_secret(tenant, presented)
    }

    fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let mut tenants: Vec<Tenant> = self.tenants.iter().map(|t| t.clone()).collect();
        tenants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tenants)
    }
}

impl RoomStore for MemoryStore {
    fn create_room(
        &self,
        app_id: &str,
        name: &str,
        max_participants: u32,
    ) -> Result<RoomRecord, StoreError> {
        let room = RoomRecord {
            id: ids::generate_id(),
            app_id: app_id.to_string(),
            name: name.to_string(),
            max_participants: max_participants.max(1),
            created_at: Utc::now(),
        };
        self.rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    fn get_room(&self, room_id: &str) -> Result<RoomRecord, StoreError> {
        self.rooms
            .get(room_id)
            .map(|r| r.clone())
            .ok_or(StoreError::NotFound)
    }

    fn list_rooms(&self, app_id: &str) -> Result<Vec<RoomRecord>, StoreError> {
        let mut rooms: Vec<RoomRecord> = self
            .rooms
            .iter()
            .filter(|r| r.app_id == app_id)
            .map(|r| r.clone())
            .collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rooms)
    }
}
