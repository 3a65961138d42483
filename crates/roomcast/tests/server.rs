//! Integration tests for the relay server over real WebSocket connections.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use roomcast::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port; returns its address and registry.
async fn start_server(builder: RoomcastServerBuilder) -> (String, RelayRegistry) {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let registry = server.registry();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, registry)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, value: serde_json::Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send should succeed");
}

async fn join(ws: &mut ClientWs, session: &str) {
    send_json(
        ws,
        serde_json::json!({ "type": "join_room", "session_id": session }),
    )
    .await;
}

async fn send_move(ws: &mut ClientWs, session: &str, square: &str, piece: &str) {
    send_json(
        ws,
        serde_json::json!({
            "type": "move",
            "session_id": session,
            "position": { square: piece },
        }),
    )
    .await;
}

/// Reads the next data frame and decodes it as a session action.
async fn recv_action(ws: &mut ClientWs) -> SessionActionMessage {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for broadcast")
        .expect("stream ended")
        .expect("websocket error");
    assert!(msg.is_text(), "broadcasts are JSON text frames");
    serde_json::from_slice(&msg.into_data()).expect("decode action")
}

/// Polls `check` until it returns true, or panics after ~2 s.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

async fn member_count(registry: &RelayRegistry, session: &str) -> Option<usize> {
    let room = registry.find(&SessionId::new(session)).await?;
    room.info().await.ok().map(|info| info.member_count)
}

async fn wait_for_members(registry: &RelayRegistry, session: &str, n: usize) {
    eventually(|| async move { member_count(registry, session).await == Some(n) })
        .await;
}

async fn wait_for_no_room(registry: &RelayRegistry, session: &str) {
    eventually(|| async move {
        registry.find(&SessionId::new(session)).await.is_none()
    })
    .await;
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_move_is_broadcast_to_every_member() {
    let (addr, registry) = start_server(RoomcastServerBuilder::new()).await;
    let mut white = connect(&addr).await;
    let mut black = connect(&addr).await;

    join(&mut white, "abc").await;
    join(&mut black, "abc").await;
    wait_for_members(&registry, "abc", 2).await;

    send_move(&mut white, "abc", "e4", "wP").await;

    for ws in [&mut white, &mut black] {
        let action = recv_action(ws).await;
        assert_eq!(action.session_id, SessionId::new("abc"));
        assert_eq!(action.position.get("e4").map(String::as_str), Some("wP"));
    }
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (addr, registry) = start_server(RoomcastServerBuilder::new()).await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    join(&mut a, "one").await;
    join(&mut b, "two").await;
    wait_for_members(&registry, "one", 1).await;
    wait_for_members(&registry, "two", 1).await;

    send_move(&mut a, "one", "d4", "wP").await;
    send_move(&mut b, "two", "c5", "bP").await;

    let got_a = recv_action(&mut a).await;
    let got_b = recv_action(&mut b).await;
    assert_eq!(got_a.session_id, SessionId::new("one"));
    assert_eq!(got_b.session_id, SessionId::new("two"));
}

#[tokio::test]
async fn test_room_removed_after_last_client_disconnects() {
    let (addr, registry) = start_server(RoomcastServerBuilder::new()).await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    join(&mut a, "abc").await;
    join(&mut b, "abc").await;
    wait_for_members(&registry, "abc", 2).await;

    b.close(None).await.unwrap();
    wait_for_members(&registry, "abc", 1).await;

    a.close(None).await.unwrap();
    wait_for_no_room(&registry, "abc").await;
}

#[tokio::test]
async fn test_move_without_room_is_dropped() {
    let (addr, registry) = start_server(RoomcastServerBuilder::new()).await;
    let mut ws = connect(&addr).await;

    send_move(&mut ws, "ghost", "e4", "wP").await;
    assert_eq!(registry.room_count().await, 0);

    // The connection is still usable afterwards.
    join(&mut ws, "ghost").await;
    wait_for_members(&registry, "ghost", 1).await;
    send_move(&mut ws, "ghost", "e5", "bP").await;
    let action = recv_action(&mut ws).await;
    assert!(action.position.contains_key("e5"));
    assert!(!action.position.contains_key("e4"));
}

#[tokio::test]
async fn test_undecodable_frames_are_skipped() {
    let (addr, registry) = start_server(RoomcastServerBuilder::new()).await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("not json at all")).await.unwrap();
    send_json(&mut ws, serde_json::json!({ "type": "resign" })).await;
    join(&mut ws, "abc").await;

    wait_for_members(&registry, "abc", 1).await;
}

#[tokio::test]
async fn test_joining_second_session_closes_connection() {
    let (addr, registry) = start_server(RoomcastServerBuilder::new()).await;
    let mut ws = connect(&addr).await;

    join(&mut ws, "first").await;
    wait_for_members(&registry, "first", 1).await;
    join(&mut ws, "second").await;

    // The handler ends; its guard takes the client out of "first", and
    // the refused join never started a room for "second".
    wait_for_no_room(&registry, "first").await;
    assert!(registry.find(&SessionId::new("second")).await.is_none());
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn test_idle_connection_times_out_and_leaves_room() {
    let builder =
        RoomcastServerBuilder::new().idle_timeout(Duration::from_millis(100));
    let (addr, registry) = start_server(builder).await;
    let mut ws = connect(&addr).await;

    join(&mut ws, "sleepy").await;
    wait_for_members(&registry, "sleepy", 1).await;

    wait_for_no_room(&registry, "sleepy").await;
}

#[tokio::test]
async fn test_custom_room_config_is_used() {
    let builder =
        RoomcastServerBuilder::new().room_config(RoomConfig { event_buffer: 8 });
    let (addr, registry) = start_server(builder).await;
    let mut ws = connect(&addr).await;

    join(&mut ws, "abc").await;
    wait_for_members(&registry, "abc", 1).await;
    send_move(&mut ws, "abc", "a1", "wR").await;

    let action = recv_action(&mut ws).await;
    assert_eq!(action.position.get("a1").map(String::as_str), Some("wR"));
}
