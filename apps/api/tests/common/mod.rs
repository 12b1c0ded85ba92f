//! Common test utilities for API integration tests
//!
//! Clients here talk to the gateway through the same unbounded channels a
//! WebSocket connection uses, so tests can drive whole sessions without a
//! socket.

#![allow(dead_code)]

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use syncjam_api::models::ParticipantId;
use syncjam_api::websocket::ServerMessage;
use syncjam_api::{AppState, Gateway, SessionRegistry};
use syncjam_shared_config::SessionConfig;

/// A fresh gateway over an empty registry
pub fn gateway() -> Gateway {
    gateway_with(SessionConfig::default())
}

pub fn gateway_with(config: SessionConfig) -> Gateway {
    Gateway::new(SessionRegistry::new(CancellationToken::new()), config)
}

/// Application state sharing one registry between the gateway and routes
pub fn app_state() -> AppState {
    AppState::new(
        SessionRegistry::new(CancellationToken::new()),
        SessionConfig::default(),
    )
}

/// A connected client with its outbound queue
pub struct TestClient {
    pub id: ParticipantId,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
    gateway: Gateway,
}

impl TestClient {
    /// Connect and consume the server-time greeting
    pub fn connect(gateway: &Gateway) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = gateway.connect(tx);
        let mut client = Self {
            id,
            rx,
            gateway: gateway.clone(),
        };
        let greeting = client.try_recv().expect("server-time greeting");
        assert_eq!(greeting["type"], "server-time");
        client
    }

    /// Send a raw JSON frame
    pub async fn send(&self, frame: Value) {
        self.gateway.handle_text(self.id, &frame.to_string()).await;
    }

    pub async fn send_text(&self, text: &str) {
        self.gateway.handle_text(self.id, text).await;
    }

    pub async fn disconnect(&self) {
        self.gateway.disconnect(self.id).await;
    }

    /// Next queued message as JSON, if any
    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx
            .try_recv()
            .ok()
            .map(|msg| serde_json::to_value(msg).expect("server message serializes"))
    }

    /// Wait for the next message
    pub async fn recv(&mut self) -> Value {
        let msg = self.rx.recv().await.expect("connection closed");
        serde_json::to_value(msg).expect("server message serializes")
    }

    /// Every queued message
    pub fn drain(&mut self) -> Vec<Value> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Queued message types in order
    pub fn drain_types(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|v| v["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

/// Create a room as `name` and return its code
pub async fn create_room(client: &mut TestClient, name: &str) -> String {
    client
        .send(serde_json::json!({
            "type": "create-room",
            "payload": { "displayName": name }
        }))
        .await;
    let created = client.try_recv().expect("room-created");
    assert_eq!(created["type"], "room-created");
    created["payload"]["code"]
        .as_str()
        .expect("room code")
        .to_string()
}

/// Join `code` as `name` and return the room-joined payload
pub async fn join_room(client: &mut TestClient, code: &str, name: &str) -> Value {
    client
        .send(serde_json::json!({
            "type": "join-room",
            "payload": { "code": code, "displayName": name }
        }))
        .await;
    let joined = client.try_recv().expect("join reply");
    assert_eq!(joined["type"], "room-joined", "unexpected reply: {}", joined);
    joined["payload"].clone()
}
