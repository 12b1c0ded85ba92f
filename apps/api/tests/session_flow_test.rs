//! Integration tests for the session lifecycle over the gateway
//!
//! Covers room creation, joining, host failover, deletion of empty
//! sessions and the playback heartbeat.

mod common;

use std::time::Duration;

use common::{create_room, gateway, join_room, TestClient};
use serde_json::json;
use syncjam_api::models::RoomCode;

#[tokio::test]
async fn test_create_then_join_with_taken_name() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);

    let code = create_room(&mut alice, "Alice").await;
    assert_eq!(code.len(), 6);
    assert!(RoomCode::parse(&code).is_ok());

    let joined = join_room(&mut bob, &code, "Alice").await;
    assert_eq!(joined["displayName"], "Alice1");
    assert_eq!(joined["isHost"], false);
    assert_eq!(joined["code"], code.as_str());
    assert_eq!(joined["participants"].as_array().map(Vec::len), Some(2));

    let announced = alice.try_recv().expect("participant-joined");
    assert_eq!(announced["type"], "participant-joined");
    assert_eq!(announced["payload"]["participant"]["displayName"], "Alice1");
}

#[tokio::test]
async fn test_join_is_case_insensitive() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);

    let code = create_room(&mut alice, "Alice").await;
    let joined = join_room(&mut bob, &code.to_lowercase(), "Bob").await;
    assert_eq!(joined["code"], code.as_str());
}

#[tokio::test]
async fn test_join_unknown_room_reports_join_error() {
    let gateway = gateway();
    let mut bob = TestClient::connect(&gateway);

    bob.send(json!({"type": "join-room", "payload": {"code": "ZZZZZZ", "displayName": "Bob"}}))
        .await;
    let reply = bob.try_recv().expect("reply");
    assert_eq!(reply["type"], "room-join-error");
    assert_eq!(reply["payload"]["reason"], "Room not found");

    bob.send(json!({"type": "join-room", "payload": {"code": "AB", "displayName": "Bob"}}))
        .await;
    let reply = bob.try_recv().expect("reply");
    assert_eq!(reply["type"], "room-join-error");
}

#[tokio::test]
async fn test_malformed_frame_gets_error() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);

    alice.send_text("not json").await;
    let reply = alice.try_recv().expect("error frame");
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], "INVALID_MESSAGE");

    alice.send(json!({"type": "no-such-message", "payload": {}})).await;
    assert_eq!(alice.try_recv().expect("error frame")["type"], "error");
}

#[tokio::test]
async fn test_echo_probe_is_answered() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);

    alice
        .send(json!({"type": "echo-probe", "payload": {"timestamp": 1234}}))
        .await;
    let reply = alice.try_recv().expect("echo");
    assert_eq!(reply["type"], "echo-response");
    assert_eq!(reply["payload"]["timestamp"], 1234);
}

#[tokio::test]
async fn test_follower_commands_are_ignored() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);
    let code = create_room(&mut alice, "Alice").await;
    join_room(&mut bob, &code, "Bob").await;
    alice.drain();

    bob.send(json!({
        "type": "player-state-change",
        "payload": {"code": code, "state": "playing", "position": 3.0}
    }))
    .await;
    bob.send(json!({"type": "shuffle-playlist", "payload": {"code": code}}))
        .await;

    assert!(alice.drain().is_empty());
    assert!(bob.drain().is_empty());
}

#[tokio::test]
async fn test_host_disconnect_promotes_oldest_follower() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);
    let mut carol = TestClient::connect(&gateway);

    let code = create_room(&mut alice, "Alice").await;
    join_room(&mut bob, &code, "Bob").await;
    join_room(&mut carol, &code, "Carol").await;
    bob.drain();
    carol.drain();

    alice.disconnect().await;

    let messages = bob.drain();
    assert_eq!(messages[0]["type"], "participant-left");
    assert_eq!(messages[0]["payload"]["participant"]["displayName"], "Alice");
    assert_eq!(messages[1]["type"], "host-changed");
    assert_eq!(messages[1]["payload"]["newHostId"], bob.id.to_string());
    assert_eq!(
        carol.drain_types(),
        vec!["participant-left".to_string(), "host-changed".to_string()]
    );

    // The new host can now drive playback
    bob.send(json!({
        "type": "player-state-change",
        "payload": {"code": code, "state": "paused", "position": 12.0}
    }))
    .await;
    let state = carol.try_recv().expect("player-state-change");
    assert_eq!(state["type"], "player-state-change");
    assert_eq!(state["payload"]["position"], 12.0);
}

#[tokio::test]
async fn test_last_leave_deletes_session() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);

    let code = create_room(&mut alice, "Alice").await;
    assert_eq!(gateway.registry().len(), 1);

    alice
        .send(json!({"type": "leave-room", "payload": {"code": code}}))
        .await;
    assert!(gateway.registry().is_empty());
    assert!(gateway.connections().rooms_of(alice.id).is_empty());

    bob.send(json!({"type": "join-room", "payload": {"code": code, "displayName": "Bob"}}))
        .await;
    assert_eq!(bob.try_recv().expect("reply")["type"], "room-join-error");
}

#[tokio::test]
async fn test_disconnect_leaves_every_room() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);

    let first = create_room(&mut alice, "Alice").await;
    let second = create_room(&mut bob, "Bob").await;
    join_room(&mut alice, &second, "Alice").await;
    assert_eq!(gateway.registry().len(), 2);

    alice.disconnect().await;

    assert_eq!(gateway.registry().len(), 1);
    let remaining = RoomCode::parse(&second).expect("valid code");
    assert!(gateway.registry().get(&remaining).is_some());
    assert!(gateway
        .registry()
        .get(&RoomCode::parse(&first).expect("valid code"))
        .is_none());
    assert!(!gateway.connections().is_connected(alice.id));
}

#[tokio::test]
async fn test_playlist_flow_reaches_followers() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);
    let code = create_room(&mut alice, "Alice").await;
    join_room(&mut bob, &code, "Bob").await;
    alice.drain();

    for id in ["A", "B"] {
        alice
            .send(json!({
                "type": "add-to-playlist",
                "payload": {"code": code, "trackId": id, "title": format!("Track {}", id), "duration": 180.0}
            }))
            .await;
    }

    let types = bob.drain_types();
    assert_eq!(
        types,
        vec![
            "playlist-updated".to_string(),
            "track-changed".to_string(),
            "playlist-updated".to_string(),
        ]
    );

    alice
        .send(json!({"type": "advance", "payload": {"code": code}}))
        .await;
    let changed = bob.try_recv().expect("track-changed");
    assert_eq!(changed["type"], "track-changed");
    assert_eq!(changed["payload"]["trackId"], "B");

    // A late joiner sees the whole state
    let mut carol = TestClient::connect(&gateway);
    let snapshot = join_room(&mut carol, &code, "Carol").await;
    assert_eq!(snapshot["playlist"].as_array().map(Vec::len), Some(2));
    assert_eq!(snapshot["currentTrack"]["id"], "B");
}

#[tokio::test]
async fn test_collaborative_setting_gates_follower_adds() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);
    let code = create_room(&mut alice, "Alice").await;
    join_room(&mut bob, &code, "Bob").await;
    alice.drain();

    let add = json!({"type": "add-to-playlist", "payload": {"code": code, "trackId": "X"}});
    bob.send(add.clone()).await;
    assert!(alice.drain().is_empty());

    alice
        .send(json!({
            "type": "update-room-settings",
            "payload": {"code": code, "settings": {"collaborativePlaylist": true}}
        }))
        .await;
    alice.drain();
    bob.drain();

    bob.send(add).await;
    assert_eq!(alice.drain_types()[0], "playlist-updated");
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_relays_position_while_playing() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);
    let code = create_room(&mut alice, "Alice").await;
    join_room(&mut bob, &code, "Bob").await;
    alice.drain();

    alice
        .send(json!({
            "type": "player-state-change",
            "payload": {"code": code, "state": "playing", "position": 10.0}
        }))
        .await;
    assert_eq!(bob.recv().await["type"], "player-state-change");

    // The paused clock auto-advances to the next heartbeat tick
    let tick = bob.recv().await;
    assert_eq!(tick["type"], "sync-time");
    assert_eq!(tick["payload"]["state"], "playing");
    assert!(tick["payload"]["position"].as_f64().unwrap_or_default() >= 10.0);
    assert!(alice.drain().is_empty(), "host never receives heartbeats");

    alice
        .send(json!({
            "type": "player-state-change",
            "payload": {"code": code, "state": "paused", "position": 14.0}
        }))
        .await;
    assert_eq!(bob.recv().await["type"], "player-state-change");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(bob.drain().is_empty(), "heartbeat stops once paused");
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_stops_on_host_departure_and_session_deletion() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);
    let mut carol = TestClient::connect(&gateway);
    let code = create_room(&mut alice, "Alice").await;
    join_room(&mut bob, &code, "Bob").await;
    join_room(&mut carol, &code, "Carol").await;
    let handle = gateway
        .registry()
        .get(&RoomCode::parse(&code).expect("valid code"))
        .expect("live session");

    let play = |position: f64| {
        json!({
            "type": "player-state-change",
            "payload": {"code": code, "state": "playing", "position": position}
        })
    };

    alice.send(play(5.0)).await;
    bob.drain();
    carol.drain();
    assert_eq!(carol.recv().await["type"], "sync-time");
    bob.drain();

    alice.disconnect().await;
    assert_eq!(
        carol.drain_types(),
        vec!["participant-left".to_string(), "host-changed".to_string()]
    );
    bob.drain();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(carol.drain().is_empty(), "no heartbeat after the host left");

    // The promoted host restarts it
    bob.send(play(20.0)).await;
    assert_eq!(carol.recv().await["type"], "player-state-change");
    assert_eq!(carol.recv().await["type"], "sync-time");

    for client in [&bob, &carol] {
        client
            .send(json!({"type": "leave-room", "payload": {"code": code}}))
            .await;
    }
    assert!(gateway.registry().is_empty());
    assert!(handle.cancel_token().is_cancelled());
    assert!(handle.lock().await.is_closed());
    assert!(!handle.lock().await.heartbeat_running());
}

#[tokio::test]
async fn test_rename_conflict_reports_username_error() {
    let gateway = gateway();
    let mut alice = TestClient::connect(&gateway);
    let mut bob = TestClient::connect(&gateway);
    let code = create_room(&mut alice, "Alice").await;
    join_room(&mut bob, &code, "Bob").await;
    alice.drain();

    bob.send(json!({"type": "update-username", "payload": {"code": code, "displayName": "Alice"}}))
        .await;
    assert_eq!(bob.try_recv().expect("reply")["type"], "username-error");

    bob.send(json!({"type": "update-username", "payload": {"code": code, "displayName": "Robert"}}))
        .await;
    let updated = alice.try_recv().expect("username-updated");
    assert_eq!(updated["type"], "username-updated");
    assert_eq!(updated["payload"]["oldName"], "Bob");
    assert_eq!(updated["payload"]["newName"], "Robert");
}
