//! JSON snapshot store backend
//!
//! Persists the whole tenant/room table as one pretty-printed JSON file.
//! Mutations rewrite the file through a sibling temp file and rename, so
//! a crash mid-write leaves the previous snapshot intact. Suited to
//! single-node deployments; a real database slots in behind the same
//! traits.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::ids;
use crate::types::{RoomRecord, Tenant};
use crate::{verify_presented_secret, RoomStore, TenantStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    tenants: HashMap<String, Tenant>,
    #[serde(default)]
    rooms: HashMap<String, RoomRecord>,
}

/// File-backed store selected by the `store path` configuration input
pub struct JsonStore {
    path: PathBuf,
    state: Mutex<Snapshot>,
}

impl JsonStore {
    /// Open or create the snapshot at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let bytes = fs::read(&path)?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Persistence(format!("parse {}: {}", path.display(), e)))?;
            debug!(
                tenants = snapshot.tenants.len(),
                rooms = snapshot.rooms.len(),
                "loaded store snapshot"
            );
            snapshot
        } else {
            Snapshot::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn persist(&self, state: &Snapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Persistence(format!("encode snapshot: {}", e)))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TenantStore for JsonStore {
    fn create_tenant(&self, name: &str) -> Result<Tenant, StoreError> {
        let mut state = self.state.lock().expect("store poisoned");
        let tenant = Tenant {
            id: ids::generate_id(),
            name: name.to_string(),
            secret: ids::generate_secret(),
            created_at: Utc::now(),
        };
        state.tenants.insert(tenant.id.clone(), tenant.clone());
        self.persist(&state)?;
        Ok(tenant)
    }

    fn lookup(&self, tenant_id: &str) -> Result<Tenant, StoreError> {
        let state = self.state.lock().expect("store poisoned");
        state.tenants.get(tenant_id).cloned().ok_or(StoreError::NotFound)
    }

    fn verify_secret(&self, tenant_id: &str, presented: &str) -> Result<Tenant, StoreError> {
        let tenant = {
            let state = self.state.lock().expect("store poisoned");
            state.tenants.get(tenant_id).cloned()
        };
        verify_presented_secret(tenant, presented)
    }

    fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let state = self.state.lock().expect("store poisoned");
        let mut tenants: Vec<Tenant> = state.tenants.values().cloned().collect();
        tenants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tenants)
    }
}

impl RoomStore for JsonStore {
    fn create_room(
        &self,
        app_id: &str,
        name: &str,
        max_participants: u32,
    ) -> Result<RoomRecord, StoreError> {
        let mut state = self.state.lock().expect("store poisoned");
        let room = RoomRecord {
            id: ids::generate_id(),
            app_id: app_id.to_string(),
            name: name.to_string(),
            max_participants: max_participants.max(1),
            created_at: Utc::now(),
        };
        state.rooms.insert(room.id.clone(), room.clone());
        self.persist(&state)?;
        Ok(room)
    }

    fn get_room(&self, room_id: &str) -> Result<RoomRecord, StoreError> {
        let state = self.state.lock().expect("store poisoned");
        state.rooms.get(room_id).cloned().ok_or(StoreError::NotFound)
    }

    fn list_rooms(&self, app_id: &str) -> Result<Vec<RoomRecord>, StoreError> {
        let state = self.state.lock().expect("store poisoned");
        let mut rooms: Vec<RoomRecord> = state
            .rooms
            .values()
            .filter(|r| r.app_id == app_id)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rooms)
    }
}
