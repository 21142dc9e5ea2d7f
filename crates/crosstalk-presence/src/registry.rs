//! The presence registry
//!
//! Maps connections to peers and rooms to member sets. Both indices live
//! behind one mutex so every public operation is observable-atomic:
//! either the forward index (peer -> room) and the reverse index
//! (room -> members) both reflect a change, or neither does. No
//! operation blocks, suspends, or touches the network while the lock is
//! held; callers receive cloned sender handles and do their own sends
//! after the lock is released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::error::{AdmitError, DuplicateConnection};

/// Fallback participant cap when a room has no stored record
pub const DEFAULT_ROOM_CAPACITY: usize = 2;

/// Process-unique identifier for one transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    /// Allocate the next id. Ids are never reused within a process.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Snapshot of one admitted room member, taken under the registry lock
#[derive(Debug, Clone)]
pub struct Member<M> {
    pub connection: ConnectionId,
    pub user_id: String,
    /// The member's outbound queue; sends happen outside the lock
    pub sender: mpsc::Sender<M>,
}

/// Result of a voluntary leave
#[derive(Debug)]
pub struct Departure<M> {
    pub room_id: String,
    pub remaining: Vec<Member<M>>,
}

/// Result of tearing down a connection that was admitted
#[derive(Debug)]
pub struct Disconnection<M> {
    pub room_id: String,
    pub user_id: String,
    pub remaining: Vec<Member<M>>,
}

struct Peer<M> {
    sender: mpsc::Sender<M>,
    room_id: Option<String>,
    user_id: Option<String>,
    tenant_id: Option<String>,
}

struct RoomEntry {
    /// Pinned by the first admission; all members must match
    tenant_id: String,
    /// Member connections in admission order
    members: Vec<ConnectionId>,
    capacity: usize,
}

struct Inner<M> {
    peers: HashMap<ConnectionId, Peer<M>>,
    rooms: HashMap<String, RoomEntry>,
}

/// Connection and room presence, shared across all signaling sessions.
///
/// Generic over the outbound message type so the registry stays
/// protocol-agnostic and tests can use plain values.
pub struct PresenceRegistry<M> {
    inner: Mutex<Inner<M>>,
}

impl<M> Default for PresenceRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> PresenceRegistry<M> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                peers: HashMap::new(),
                rooms: HashMap::new(),
            }),
        }
    }

    /// Create an unadmitted peer record for a fresh connection.
    ///
    /// Not idempotent: ids are process-unique, so a duplicate means the
    /// endpoint wired itself up twice.
    pub fn register(
        &self,
        connection: ConnectionId,
        sender: mpsc::Sender<M>,
    ) -> Result<(), DuplicateConnection> {
        let mut inner = self.inner.lock().expect("registry poisoned");
        if inner.peers.contains_key(&connection) {
            return Err(DuplicateConnection);
        }
        inner.peers.insert(
            connection,
            Peer {
                sender,
                room_id: None,
                user_id: None,
                tenant_id: None,
            },
        );
        Ok(())
    }

    /// Admit a registered peer to a room.
    ///
    /// Returns the members present *before* this admission, in admission
    /// order; the caller uses them for `joined.peers` and notification
    /// fan-out. When the room entry does not exist it is created with its
    /// tenant pinned to `tenant_id` and the supplied capacity (clamped to
    /// at least one seat). If two admissions race for the last seat,
    /// exactly one succeeds.
    pub fn admit(
        &self,
        connection: ConnectionId,
        room_id: &str,
        user_id: &str,
        tenant_id: &str,
        capacity: usize,
    ) -> Result<Vec<Member<M>>, AdmitError> {
        let mut inner = self.inner.lock().expect("registry poisoned");

        match inner.peers.get(&connection) {
            None => return Err(AdmitError::NoSuchConnection),
            Some(peer) if peer.room_id.is_some() => return Err(AdmitError::AlreadyAdmitted),
            Some(_) => {}
        }

        if let Some(entry) = inner.rooms.get(room_id) {
            if entry.tenant_id != tenant_id {
                return Err(AdmitError::TenantMismatch);
            }
            if entry.members.len() >= entry.capacity {
                return Err(AdmitError::RoomFull);
            }
        }

        let existing = match inner.rooms.get(room_id) {
            Some(entry) => snapshot_members(&inner.peers, &entry.members),
            None => Vec::new(),
        };

        let entry = inner
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomEntry {
                tenant_id: tenant_id.to_string(),
                members: Vec::new(),
                capacity: capacity.max(1),
            });
        entry.members.push(connection);

        let peer = inner
            .peers
            .get_mut(&connection)
            .expect("peer checked above");
        peer.room_id = Some(room_id.to_string());
        peer.user_id = Some(user_id.to_string());
        peer.tenant_id = Some(tenant_id.to_string());

        Ok(existing)
    }

    /// Remove an admitted peer from its room, keeping the peer record.
    ///
    /// Returns `None` when the peer is not admitted. The room entry is
    /// deleted when its last member leaves.
    pub fn leave(&self, connection: ConnectionId) -> Option<Departure<M>> {
        let mut inner = self.inner.lock().expect("registry poisoned");
        Self::leave_locked(&mut inner, connection).map(|(room_id, _user, remaining)| Departure {
            room_id,
            remaining,
        })
    }

    /// Tear down a connection: leave its room (if admitted) and delete
    /// the peer record. Returns the departure details only when the peer
    /// was admitted.
    pub fn drop_connection(&self, connection: ConnectionId) -> Option<Disconnection<M>> {
        let mut inner = self.inner.lock().expect("registry poisoned");
        let departed = Self::leave_locked(&mut inner, connection);
        inner.peers.remove(&connection);
        departed.map(|(room_id, user_id, remaining)| Disconnection {
            room_id,
            user_id,
            remaining,
        })
    }

    /// All *other* members in the caller's room, in admission order.
    pub fn peers_of(&self, connection: ConnectionId) -> Vec<Member<M>> {
        let inner = self.inner.lock().expect("registry poisoned");
        let room_id = match inner.peers.get(&connection).and_then(|p| p.room_id.as_ref()) {
            Some(room_id) => room_id,
            None => return Vec::new(),
        };
        let entry = match inner.rooms.get(room_id) {
            Some(entry) => entry,
            None => return Vec::new(),
        };
        let others: Vec<ConnectionId> = entry
            .members
            .iter()
            .copied()
            .filter(|c| *c != connection)
            .collect();
        snapshot_members(&inner.peers, &others)
    }

    /// Snapshot of the user-ids currently in a room, in admission order.
    pub fn users_of(&self, room_id: &str) -> Vec<String> {
        let inner = self.inner.lock().expect("registry poisoned");
        let entry = match inner.rooms.get(room_id) {
            Some(entry) => entry,
            None => return Vec::new(),
        };
        entry
            .members
            .iter()
            .filter_map(|c| inner.peers.get(c))
            .filter_map(|p| p.user_id.clone())
            .collect()
    }

    /// Shared leave logic; the lock is already held.
    ///
    /// A peer whose room entry has vanished (a state only reachable if
    /// the registry was misused) is quietly reset rather than treated as
    /// an error.
    fn leave_locked(
        inner: &mut Inner<M>,
        connection: ConnectionId,
    ) -> Option<(String, String, Vec<Member<M>>)> {
        let peer = inner.peers.get_mut(&connection)?;
        let room_id = peer.room_id.take()?;
        let user_id = peer.user_id.take().unwrap_or_default();
        peer.tenant_id = None;

        let entry = match inner.rooms.get_mut(&room_id) {
            Some(entry) => entry,
            None => return None,
        };
        entry.members.retain(|c| *c != connection);

        if entry.members.is_empty() {
            inner.rooms.remove(&room_id);
            return Some((room_id, user_id, Vec::new()));
        }

        let remaining = entry.members.clone();
        let remaining = snapshot_members(&inner.peers, &remaining);
        Some((room_id, user_id, remaining))
    }

    #[cfg(test)]
    fn room_count(&self) -> usize {
        self.inner.lock().unwrap().rooms.len()
    }

    #[cfg(test)]
    fn peer_count(&self) -> usize {
        self.inner.lock().unwrap().peers.len()
    }
}

fn snapshot_members<M>(
    peers: &HashMap<ConnectionId, Peer<M>>,
    members: &[ConnectionId],
) -> Vec<Member<M>> {
    members
        .iter()
        .filter_map(|c| {
            let peer = peers.get(c)?;
            Some(Member {
                connection: *c,
                user_id: peer.user_id.clone().unwrap_or_default(),
                sender: peer.sender.clone(),
            })
        })
        .collect()
}
