//! End-to-end signaling tests
//!
//! Each test boots both listeners on ephemeral ports and drives real
//! WebSocket clients against the signaling plane. Tenants, rooms, and
//! grants are set up through the shared state the server itself uses.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use crosstalk_grant::GrantClaims;
use crosstalk_protocol::{
    ClientFrame, ErrorCode, IceCandidate, Role, SdpType, ServerFrame, SessionDescription,
};
use crosstalk_server::{AppState, Server, ServerConfig};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

struct TestServer {
    signaling_addr: SocketAddr,
    state: AppState,
}

async fn start_server(heartbeat_secs: u64) -> TestServer {
    let mut config = ServerConfig {
        host: "127.0.0.1".to_string(),
        api_port: 0,
        signaling_port: 0,
        signing_secret: Some("e2e-signing-secret".to_string()),
        heartbeat_secs,
        ..Default::default()
    };
    config.validate().unwrap();
    let state = AppState::from_config(&config).unwrap();
    let server = Server::bind(&config, state.clone()).await.unwrap();
    let signaling_addr = server.signaling_addr();
    tokio::spawn(server.serve(std::future::pending::<()>()));
    TestServer {
        signaling_addr,
        state,
    }
}

impl TestServer {
    /// Create a tenant and a room, returning (tenant_id, room_id)
    fn setup_room(&self, max_participants: u32) -> (String, String) {
        let tenant = self.state.tenants.create_tenant("e2e").unwrap();
        let room = self
            .state
            .rooms
            .create_room(&tenant.id, "call", max_participants)
            .unwrap();
        (tenant.id, room.id)
    }

    fn grant(&self, tenant_id: &str, room_id: &str, user_id: &str, role: Role) -> String {
        self.state
            .signer
            .issue(tenant_id, room_id, user_id, role, Duration::from_secs(3600))
            .unwrap()
            .token
    }
}

struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        Self { ws }
    }

    async fn send(&mut self, frame: &ClientFrame) {
        let json = serde_json::to_string(frame).unwrap();
        self.ws.send(WsMessage::Text(json.into())).await.unwrap();
    }

    /// Next protocol frame, skipping transport-level ping/pong
    async fn recv(&mut self) -> ServerFrame {
        loop {
            let message = timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("connection closed while waiting for frame")
                .expect("transport error while waiting for frame");
            match message {
                WsMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    /// Drain until the server closes the connection
    async fn expect_close(&mut self) {
        loop {
            match timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for close")
            {
                None | Some(Ok(WsMessage::Close(_))) => return,
                Some(Ok(_)) => continue,
                Some(Err(_)) => return,
            }
        }
    }

    /// Assert no protocol frame arrives within `window`
    async fn assert_silent(&mut self, window: Duration) {
        let got_frame = timeout(window, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(WsMessage::Text(text))) => return text.to_string(),
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => {
                        std::future::pending::<String>().await;
                    }
                }
            }
        })
        .await;
        if let Ok(frame) = got_frame {
            panic!("expected silence, got {}", frame);
        }
    }
}

fn assert_error(frame: ServerFrame, expected: ErrorCode) {
    match frame {
        ServerFrame::Error { code, .. } => assert_eq!(code, expected),
        other => panic!("expected error {:?}, got {:?}", expected, other),
    }
}

#[tokio::test]
async fn test_happy_path_two_peer_call() {
    let server = start_server(30).await;
    let (tenant, room) = server.setup_room(2);
    let alice_token = server.grant(&tenant, &room, "alice", Role::Host);
    let bob_token = server.grant(&tenant, &room, "bob", Role::Participant);

    // Alice joins an empty room
    let mut alice = Client::connect(server.signaling_addr).await;
    alice
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: alice_token,
        })
        .await;
    assert_eq!(
        alice.recv().await,
        ServerFrame::Joined {
            room_id: room.clone(),
            user_id: "alice".to_string(),
            peers: vec![],
        }
    );

    // Bob joins; he learns about alice, alice learns she initiates
    let mut bob = Client::connect(server.signaling_addr).await;
    bob.send(&ClientFrame::Join {
        room_id: room.clone(),
        token: bob_token,
    })
    .await;
    assert_eq!(
        bob.recv().await,
        ServerFrame::Joined {
            room_id: room.clone(),
            user_id: "bob".to_string(),
            peers: vec!["alice".to_string()],
        }
    );
    assert_eq!(
        alice.recv().await,
        ServerFrame::PeerJoined {
            user_id: "bob".to_string(),
            is_initiator: true,
        }
    );

    // Offer relays verbatim with the sender stamped
    let offer = SessionDescription {
        kind: SdpType::Offer,
        sdp: Some("X".to_string()),
    };
    alice
        .send(&ClientFrame::Offer {
            sdp: offer.clone(),
        })
        .await;
    assert_eq!(
        bob.recv().await,
        ServerFrame::Offer {
            sdp: offer,
            from_user_id: "alice".to_string(),
        }
    );

    // Answer relays back
    let answer = SessionDescription {
        kind: SdpType::Answer,
        sdp: Some("Y".to_string()),
    };
    bob.send(&ClientFrame::Answer {
        sdp: answer.clone(),
    })
    .await;
    assert_eq!(
        alice.recv().await,
        ServerFrame::Answer {
            sdp: answer,
            from_user_id: "bob".to_string(),
        }
    );

    // Trickled candidates relay too
    let candidate = IceCandidate {
        candidate: Some("candidate:0 1 udp 1 198.51.100.7 9 typ host".to_string()),
        sdp_mid: Some("0".to_string()),
        sdp_m_line_index: Some(0),
        username_fragment: None,
    };
    bob.send(&ClientFrame::Ice {
        candidate: candidate.clone(),
    })
    .await;
    assert_eq!(
        alice.recv().await,
        ServerFrame::Ice {
            candidate,
            from_user_id: "bob".to_string(),
        }
    );

    // Bob disconnects abruptly; alice hears exactly one peer-left
    drop(bob);
    assert_eq!(
        alice.recv().await,
        ServerFrame::PeerLeft {
            user_id: "bob".to_string(),
        }
    );
}

#[tokio::test]
async fn test_room_full_rejects_third_peer_quietly() {
    let server = start_server(30).await;
    let (tenant, room) = server.setup_room(2);

    let mut alice = Client::connect(server.signaling_addr).await;
    alice
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: server.grant(&tenant, &room, "alice", Role::Host),
        })
        .await;
    alice.recv().await;

    let mut bob = Client::connect(server.signaling_addr).await;
    bob.send(&ClientFrame::Join {
        room_id: room.clone(),
        token: server.grant(&tenant, &room, "bob", Role::Participant),
    })
    .await;
    bob.recv().await;
    alice.recv().await; // peer-joined for bob

    let mut carol = Client::connect(server.signaling_addr).await;
    carol
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: server.grant(&tenant, &room, "carol", Role::Participant),
        })
        .await;
    assert_error(carol.recv().await, ErrorCode::RoomFull);
    carol.expect_close().await;

    // The members hear nothing about carol
    alice.assert_silent(Duration::from_millis(300)).await;
    bob.assert_silent(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_grant_must_cover_the_requested_room() {
    let server = start_server(30).await;
    let (tenant, room) = server.setup_room(2);
    let (_, other_room) = server.setup_room(2);

    // Valid grant for `room`, presented for `other_room`
    let token = server.grant(&tenant, &room, "eve", Role::Participant);
    let mut eve = Client::connect(server.signaling_addr).await;
    eve.send(&ClientFrame::Join {
        room_id: other_room,
        token,
    })
    .await;
    assert_error(eve.recv().await, ErrorCode::InvalidToken);
    eve.expect_close().await;
}

#[tokio::test]
async fn test_expired_grant_is_rejected() {
    let server = start_server(30).await;
    let (tenant, room) = server.setup_room(2);

    let now = Utc::now().timestamp();
    let claims = GrantClaims {
        jti: "expired-grant".to_string(),
        app_id: tenant.clone(),
        room_id: room.clone(),
        user_id: "alice".to_string(),
        role: Role::Host,
        iat: now - 10,
        exp: now - 2,
    };
    let token = server.state.signer.sign(&claims).unwrap();

    let mut alice = Client::connect(server.signaling_addr).await;
    alice
        .send(&ClientFrame::Join {
            room_id: room,
            token,
        })
        .await;
    assert_error(alice.recv().await, ErrorCode::TokenExpired);
    alice.expect_close().await;
}

#[tokio::test]
async fn test_foreign_tenant_grant_is_rejected_at_admission() {
    let server = start_server(30).await;
    let (_, room) = server.setup_room(2);

    // A grant signed with the real key but claiming another tenant;
    // the room record pins the true owner.
    let now = Utc::now().timestamp();
    let claims = GrantClaims {
        jti: "forged-tenant".to_string(),
        app_id: "some-other-tenant".to_string(),
        room_id: room.clone(),
        user_id: "eve".to_string(),
        role: Role::Participant,
        iat: now,
        exp: now + 600,
    };
    let token = server.state.signer.sign(&claims).unwrap();

    let mut eve = Client::connect(server.signaling_addr).await;
    eve.send(&ClientFrame::Join {
        room_id: room,
        token,
    })
    .await;
    assert_error(eve.recv().await, ErrorCode::TenantMismatch);
    eve.expect_close().await;
}

#[tokio::test]
async fn test_negotiation_before_join_leaves_connection_open() {
    let server = start_server(30).await;
    let (tenant, room) = server.setup_room(2);

    let mut alice = Client::connect(server.signaling_addr).await;
    alice
        .send(&ClientFrame::Offer {
            sdp: SessionDescription {
                kind: SdpType::Offer,
                sdp: Some("X".to_string()),
            },
        })
        .await;
    assert_error(alice.recv().await, ErrorCode::NotInRoom);

    // The connection survived; a join still works
    alice
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: server.grant(&tenant, &room, "alice", Role::Host),
        })
        .await;
    match alice.recv().await {
        ServerFrame::Joined { user_id, .. } => assert_eq!(user_id, "alice"),
        other => panic!("expected joined, got {:?}", other),
    }
}

#[tokio::test]
async fn test_second_join_reports_conflict_without_closing() {
    let server = start_server(30).await;
    let (tenant, room) = server.setup_room(2);

    let mut alice = Client::connect(server.signaling_addr).await;
    alice
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: server.grant(&tenant, &room, "alice", Role::Host),
        })
        .await;
    alice.recv().await;

    alice
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: server.grant(&tenant, &room, "alice", Role::Host),
        })
        .await;
    assert_error(alice.recv().await, ErrorCode::AlreadyInRoom);

    // Still admitted: a voluntary leave closes cleanly
    alice.send(&ClientFrame::Leave).await;
    alice.expect_close().await;
}

#[tokio::test]
async fn test_malformed_frames() {
    let server = start_server(30).await;
    let (tenant, room) = server.setup_room(2);

    // Before admission: fatal
    let mut stranger = Client::connect(server.signaling_addr).await;
    stranger
        .ws
        .send(WsMessage::Text("this is not json".into()))
        .await
        .unwrap();
    assert_error(stranger.recv().await, ErrorCode::InvalidMessage);
    stranger.expect_close().await;

    // After admission: reported, connection stays open
    let mut alice = Client::connect(server.signaling_addr).await;
    alice
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: server.grant(&tenant, &room, "alice", Role::Host),
        })
        .await;
    alice.recv().await;

    alice
        .ws
        .send(WsMessage::Text(r#"{"type":"mystery"}"#.into()))
        .await
        .unwrap();
    assert_error(alice.recv().await, ErrorCode::InvalidMessage);

    alice.send(&ClientFrame::Leave).await;
    alice.expect_close().await;
}

#[tokio::test]
async fn test_voluntary_leave_notifies_peer() {
    let server = start_server(30).await;
    let (tenant, room) = server.setup_room(2);

    let mut alice = Client::connect(server.signaling_addr).await;
    alice
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: server.grant(&tenant, &room, "alice", Role::Host),
        })
        .await;
    alice.recv().await;

    let mut bob = Client::connect(server.signaling_addr).await;
    bob.send(&ClientFrame::Join {
        room_id: room.clone(),
        token: server.grant(&tenant, &room, "bob", Role::Participant),
    })
    .await;
    bob.recv().await;
    alice.recv().await; // peer-joined

    bob.send(&ClientFrame::Leave).await;
    assert_eq!(
        alice.recv().await,
        ServerFrame::PeerLeft {
            user_id: "bob".to_string(),
        }
    );
    bob.expect_close().await;
}

#[tokio::test]
async fn test_unresponsive_peer_is_reaped_by_heartbeat() {
    // One-second heartbeat so the reap happens within the test budget
    let server = start_server(1).await;
    let (tenant, room) = server.setup_room(2);

    let mut alice = Client::connect(server.signaling_addr).await;
    alice
        .send(&ClientFrame::Join {
            room_id: room.clone(),
            token: server.grant(&tenant, &room, "alice", Role::Host),
        })
        .await;
    alice.recv().await;

    let mut bob = Client::connect(server.signaling_addr).await;
    bob.send(&ClientFrame::Join {
        room_id: room.clone(),
        token: server.grant(&tenant, &room, "bob", Role::Participant),
    })
    .await;
    bob.recv().await;
    alice.recv().await; // peer-joined

    // Bob's process "pauses": the socket stays open but is never polled
    // again, so no pongs are produced. Alice keeps polling (and so keeps
    // answering pings) and must see the reap within two intervals.
    assert_eq!(
        alice.recv().await,
        ServerFrame::PeerLeft {
            user_id: "bob".to_string(),
        }
    );
    drop(bob);
}
