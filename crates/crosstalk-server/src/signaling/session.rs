//! Per-connection signaling session
//!
//! Two tasks own each connection: this one reads frames and drives the
//! protocol state machine, and a writer drains the connection's bounded
//! outbound queue to the socket. All writes to one socket pass through
//! that single queue, so concurrent notifications from other sessions
//! serialize naturally. The presence registry is never held across an
//! await; member snapshots are taken under its lock and sends happen
//! afterwards with `try_send`.
//!
//! A full outbound queue means the receiver has stalled. The frame is
//! dropped, and the stalled connection kills itself at its next
//! heartbeat tick: either its own ping fails to enqueue or the missing
//! pong marks it dead. Either way the cleanup path below runs and the
//! surviving peer sees `peer-left` in bounded time.

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crosstalk_grant::GrantError;
use crosstalk_presence::{AdmitError, ConnectionId, DEFAULT_ROOM_CAPACITY};
use crosstalk_protocol::{ClientFrame, ErrorCode, ServerFrame};

use crate::state::AppState;

/// Outbound queue depth per connection
const OUTBOUND_QUEUE: usize = 64;

/// Items on a connection's outbound queue
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A protocol frame, serialized to one text message
    Frame(ServerFrame),
    /// Liveness probe
    Ping,
}

/// Protocol state for one connection
enum Phase {
    /// Transport up, no grant consumed yet
    Opened,
    /// Grant consumed, member of `room_id`
    Admitted { room_id: String, user_id: String },
}

impl Phase {
    fn admitted(&self) -> bool {
        matches!(self, Phase::Admitted { .. })
    }
}

/// What `handle_frame` tells the read loop to do next
enum Control {
    Continue,
    Close(CloseReason),
}

/// Why the session ended, for the close log line
#[derive(Debug, Clone, Copy)]
enum CloseReason {
    /// Client closed or the transport failed
    Transport,
    /// Client sent `leave`
    Leave,
    /// No pong between two ticks
    HeartbeatTimeout,
    /// Own outbound queue full; the peer stopped draining us
    Stalled,
    /// A fatal error frame was reported
    Fatal(ErrorCode),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport closed"),
            Self::Leave => write!(f, "left"),
            Self::HeartbeatTimeout => write!(f, "heartbeat timeout"),
            Self::Stalled => write!(f, "outbound queue stalled"),
            Self::Fatal(code) => write!(f, "fatal: {}", code),
        }
    }
}

/// Handle one WebSocket connection from accept to cleanup
pub async fn run(socket: WebSocket, state: AppState) {
    let connection = ConnectionId::next();
    debug!(%connection, "signaling connection opened");

    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);

    // Ids are process-unique, so a collision means the endpoint itself
    // is broken; there is no client to blame and nothing to clean up.
    if state.registry.register(connection, tx.clone()).is_err() {
        warn!(%connection, "duplicate connection id, refusing connection");
        return;
    }

    let writer = tokio::spawn(write_loop(sink, rx));

    let reason = read_loop(stream, &state, connection, &tx).await;

    // Exactly one teardown per connection. If the peer was admitted the
    // survivors hear about it before any close races can confuse them.
    if let Some(gone) = state.registry.drop_connection(connection) {
        info!(%connection, room = %gone.room_id, user = %gone.user_id, "peer departed");
        let note = ServerFrame::PeerLeft {
            user_id: gone.user_id,
        };
        for member in gone.remaining {
            enqueue(&member.sender, Outbound::Frame(note.clone()));
        }
    }

    debug!(%connection, %reason, "signaling connection closed");
    drop(tx);
    let _ = writer.await;
}

/// Drain the outbound queue to the socket; close when the queue does.
async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(item) = rx.recv().await {
        let message = match item {
            Outbound::Frame(frame) => match serde_json::to_string(&frame) {
                Ok(json) => Message::Text(json.into()),
                Err(err) => {
                    warn!(%err, "dropping unencodable frame");
                    continue;
                }
            },
            Outbound::Ping => Message::Ping(Bytes::new()),
        };
        if sink.send(message).await.is_err() {
            return;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
}

/// Read frames and heartbeat ticks until the session ends
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: &AppState,
    connection: ConnectionId,
    tx: &mpsc::Sender<Outbound>,
) -> CloseReason {
    let mut phase = Phase::Opened;
    let mut alive = true;

    let first_tick = tokio::time::Instant::now() + state.heartbeat;
    let mut heartbeat = tokio::time::interval_at(first_tick, state.heartbeat);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if !alive {
                    return CloseReason::HeartbeatTimeout;
                }
                alive = false;
                if tx.try_send(Outbound::Ping).is_err() {
                    return CloseReason::Stalled;
                }
            }
            next = stream.next() => match next {
                None => return CloseReason::Transport,
                Some(Err(err)) => {
                    debug!(%connection, %err, "transport error");
                    return CloseReason::Transport;
                }
                Some(Ok(Message::Pong(_))) => alive = true,
                // The transport layer answers incoming pings itself
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(_))) => return CloseReason::Transport,
                Some(Ok(Message::Text(text))) => {
                    match handle_frame(text.as_str(), state, connection, tx, &mut phase) {
                        Control::Continue => {}
                        Control::Close(reason) => return reason,
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    match report(tx, &phase, ErrorCode::InvalidMessage, "frames must be JSON text") {
                        Control::Continue => {}
                        Control::Close(reason) => return reason,
                    }
                }
            }
        }
    }
}

/// Dispatch one decoded frame against the current phase
fn handle_frame(
    text: &str,
    state: &AppState,
    connection: ConnectionId,
    tx: &mpsc::Sender<Outbound>,
    phase: &mut Phase,
) -> Control {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            debug!(%connection, %err, "unparseable frame");
            return report(tx, phase, ErrorCode::InvalidMessage, "unrecognized frame");
        }
    };

    match frame {
        ClientFrame::Join { room_id, token } => {
            handle_join(state, connection, tx, phase, room_id, token)
        }
        ClientFrame::Offer { sdp } => relay(state, connection, tx, phase, |from_user_id| {
            ServerFrame::Offer { sdp, from_user_id }
        }),
        ClientFrame::Answer { sdp } => relay(state, connection, tx, phase, |from_user_id| {
            ServerFrame::Answer { sdp, from_user_id }
        }),
        ClientFrame::Ice { candidate } => relay(state, connection, tx, phase, |from_user_id| {
            ServerFrame::Ice {
                candidate,
                from_user_id,
            }
        }),
        ClientFrame::Leave => match phase {
            Phase::Admitted { user_id, .. } => {
                let user_id = user_id.clone();
                if let Some(departure) = state.registry.leave(connection) {
                    info!(%connection, room = %departure.room_id, user = %user_id, "peer left");
                    let note = ServerFrame::PeerLeft { user_id };
                    for member in departure.remaining {
                        enqueue(&member.sender, Outbound::Frame(note.clone()));
                    }
                }
                *phase = Phase::Opened;
                Control::Close(CloseReason::Leave)
            }
            // Nothing to leave; just close
            Phase::Opened => Control::Close(CloseReason::Leave),
        },
    }
}

/// Verify a grant, admit the peer, and notify the room
fn handle_join(
    state: &AppState,
    connection: ConnectionId,
    tx: &mpsc::Sender<Outbound>,
    phase: &mut Phase,
    room_id: String,
    token: String,
) -> Control {
    if phase.admitted() {
        return report(tx, phase, ErrorCode::AlreadyInRoom, "already in a room");
    }

    let claims = match state.signer.verify(&token) {
        Ok(claims) => claims,
        Err(GrantError::Expired) => {
            return report(tx, phase, ErrorCode::TokenExpired, "grant expired");
        }
        Err(GrantError::Invalid(reason)) => {
            debug!(%connection, %reason, "grant rejected");
            return report(tx, phase, ErrorCode::InvalidToken, "grant verification failed");
        }
    };

    // The grant only covers the room it names
    if claims.room_id != room_id {
        return report(
            tx,
            phase,
            ErrorCode::InvalidToken,
            "grant does not cover this room",
        );
    }

    // The room record supplies the seat cap and an ownership
    // cross-check; a room unknown to the store gets the default cap.
    let capacity = match state.rooms.get_room(&room_id) {
        Ok(record) => {
            if record.app_id != claims.app_id {
                return report(
                    tx,
                    phase,
                    ErrorCode::TenantMismatch,
                    "room belongs to a different application",
                );
            }
            record.max_participants as usize
        }
        Err(_) => DEFAULT_ROOM_CAPACITY,
    };

    let existing = match state.registry.admit(
        connection,
        &room_id,
        &claims.user_id,
        &claims.app_id,
        capacity,
    ) {
        Ok(existing) => existing,
        Err(AdmitError::RoomFull) => {
            return report(tx, phase, ErrorCode::RoomFull, "room is full");
        }
        Err(AdmitError::TenantMismatch) => {
            return report(
                tx,
                phase,
                ErrorCode::TenantMismatch,
                "room belongs to a different application",
            );
        }
        Err(AdmitError::AlreadyAdmitted) => {
            return report(tx, phase, ErrorCode::AlreadyInRoom, "already in a room");
        }
        Err(AdmitError::NoSuchConnection) => {
            return report(tx, phase, ErrorCode::InternalError, "connection not registered");
        }
    };

    // The new member learns who was here from `joined.peers`; each
    // existing member is told a peer arrived and that it, the existing
    // side, initiates the offer. Exactly one side of each pair offers.
    let peers = existing.iter().map(|m| m.user_id.clone()).collect();
    enqueue(
        tx,
        Outbound::Frame(ServerFrame::Joined {
            room_id: room_id.clone(),
            user_id: claims.user_id.clone(),
            peers,
        }),
    );

    let note = ServerFrame::PeerJoined {
        user_id: claims.user_id.clone(),
        is_initiator: true,
    };
    for member in &existing {
        enqueue(&member.sender, Outbound::Frame(note.clone()));
    }

    info!(
        %connection,
        room = %room_id,
        user = %claims.user_id,
        role = %claims.role,
        grant = %claims.jti,
        "peer admitted"
    );
    *phase = Phase::Admitted {
        room_id,
        user_id: claims.user_id,
    };
    Control::Continue
}

/// Forward a negotiation payload to every other member, stamped with
/// the sender's user id. No other member means the frame is silently
/// dropped; that is a normal state while the first peer waits.
fn relay(
    state: &AppState,
    connection: ConnectionId,
    tx: &mpsc::Sender<Outbound>,
    phase: &Phase,
    make: impl FnOnce(String) -> ServerFrame,
) -> Control {
    let user_id = match phase {
        Phase::Admitted { user_id, .. } => user_id.clone(),
        Phase::Opened => {
            return report(
                tx,
                phase,
                ErrorCode::NotInRoom,
                "join a room before negotiating",
            );
        }
    };

    let out = make(user_id);
    for member in state.registry.peers_of(connection) {
        enqueue(&member.sender, Outbound::Frame(out.clone()));
    }
    Control::Continue
}

/// Report an error frame; fatal codes also end the session
fn report(
    tx: &mpsc::Sender<Outbound>,
    phase: &Phase,
    code: ErrorCode,
    message: &str,
) -> Control {
    enqueue(
        tx,
        Outbound::Frame(ServerFrame::Error {
            code,
            message: message.to_string(),
        }),
    );
    if code.is_fatal(phase.admitted()) {
        Control::Close(CloseReason::Fatal(code))
    } else {
        Control::Continue
    }
}

/// Non-blocking enqueue onto a connection's outbound queue.
///
/// Failure means the target's queue is full (it has stalled and will be
/// reaped by its own heartbeat) or already closed; in both cases the
/// frame is dropped.
fn enqueue(sender: &mpsc::Sender<Outbound>, item: Outbound) {
    if let Err(err) = sender.try_send(item) {
        debug!(%err, "dropping outbound frame");
    }
}
