//! Connection gateway
//!
//! Resolves inbound messages to sessions, runs them through the command
//! table under the session lock and carries out the resulting outcome:
//! fan-out, heartbeat control, membership bookkeeping and session deletion.
//! Leave and disconnect share one path.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::RoomError;
use crate::models::{now_ms, Participant, ParticipantId, RoomCode, Session};
use crate::services::{membership, LiveSession, SessionHandle, SessionRegistry};
use syncjam_shared_config::SessionConfig;

use super::commands::{Routed, SessionCommand};
use super::connection::ConnectionManager;
use super::handlers::{self, Context, Heartbeat, Membership, Outbound, Outcome, Recipients};
use super::heartbeat;
use super::messages::{ClientMessage, ErrorPayload, ServerMessage};

/// Entry point for every WebSocket connection
#[derive(Debug, Clone)]
pub struct Gateway {
    registry: SessionRegistry,
    connections: ConnectionManager,
    config: Arc<SessionConfig>,
}

impl Gateway {
    pub fn new(registry: SessionRegistry, config: SessionConfig) -> Self {
        Self {
            registry,
            connections: ConnectionManager::new(),
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Register a connection and greet it with the server clock
    pub fn connect(&self, sender: mpsc::UnboundedSender<ServerMessage>) -> ParticipantId {
        let id = Uuid::new_v4();
        self.connections.add_connection(id, sender);
        self.send(
            id,
            ServerMessage::ServerTime {
                server_time: now_ms(),
                participant_id: id,
            },
        );
        tracing::info!(participant_id = %id, "Client connected");
        id
    }

    /// Parse and dispatch one text frame
    pub async fn handle_text(&self, id: ParticipantId, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.dispatch(id, msg).await,
            Err(e) => {
                tracing::debug!(participant_id = %id, error = %e, "Failed to parse client message");
                self.send(
                    id,
                    ServerMessage::Error(ErrorPayload::invalid_message(e.to_string())),
                );
            }
        }
    }

    pub async fn dispatch(&self, id: ParticipantId, msg: ClientMessage) {
        match Routed::from(msg) {
            Routed::Echo { timestamp } => self.send(id, ServerMessage::EchoResponse { timestamp }),
            Routed::Create { display_name } => self.create(id, display_name.as_deref()),
            Routed::Session { code, command } => self.run(id, &code, command).await,
        }
    }

    /// Remove the connection and leave every room it had joined
    pub async fn disconnect(&self, id: ParticipantId) {
        let rooms = self.connections.remove_connection(id);
        for code in rooms {
            self.run_on(id, &code, SessionCommand::Leave).await;
        }
        tracing::info!(participant_id = %id, "Client disconnected");
    }

    fn create(&self, id: ParticipantId, requested: Option<&str>) {
        let display_name = match membership::host_display_name(requested) {
            Ok(name) => name,
            Err(e) => {
                self.send(id, ServerMessage::error(&e));
                return;
            }
        };

        let host = Participant::new(id, display_name.clone(), true, now_ms());
        let handle = self.registry.create(host);
        self.connections.join_room(id, handle.code());

        self.send(
            id,
            ServerMessage::RoomCreated {
                code: handle.code().clone(),
                display_name,
                participant_id: id,
            },
        );
    }

    async fn run(&self, id: ParticipantId, raw_code: &str, command: SessionCommand) {
        match RoomCode::parse(raw_code) {
            Ok(code) => self.run_on(id, &code, command).await,
            Err(e) => self.reject(id, &command, &e),
        }
    }

    async fn run_on(&self, id: ParticipantId, code: &RoomCode, command: SessionCommand) {
        let Some(handle) = self.registry.get(code) else {
            self.reject(id, &command, &RoomError::RoomNotFound);
            return;
        };

        let mut live = handle.lock().await;
        if live.is_closed() {
            self.reject(id, &command, &RoomError::RoomNotFound);
            return;
        }

        let name = command.name();
        let ctx = Context {
            now_ms: now_ms(),
            config: &self.config,
        };
        match handlers::apply(&mut live.session, id, command.clone(), ctx) {
            Ok(outcome) => self.commit(&handle, &mut live, id, outcome),
            Err(e) => {
                tracing::debug!(room = %code, participant_id = %id, command = name, error = %e, "Command rejected");
                self.reject(id, &command, &e);
            }
        }
    }

    /// Carry out an outcome while still holding the session lock
    fn commit(
        &self,
        handle: &Arc<SessionHandle>,
        live: &mut LiveSession,
        sender: ParticipantId,
        outcome: Outcome,
    ) {
        match outcome.membership {
            Some(Membership::Joined) => self.connections.join_room(sender, handle.code()),
            Some(Membership::Left) => self.connections.leave_room(sender, handle.code()),
            None => {}
        }

        self.deliver(&live.session, sender, outcome.outbound);

        match outcome.heartbeat {
            Some(Heartbeat::Start) if !live.heartbeat_running() => {
                let period = self.config.host_sync_interval();
                live.set_heartbeat(heartbeat::spawn(handle, self.connections.clone(), period));
            }
            Some(Heartbeat::Stop) => {
                live.stop_heartbeat();
            }
            _ => {}
        }

        if outcome.session_empty {
            self.registry.remove(handle, live);
        }
    }

    fn deliver(&self, session: &Session, sender: ParticipantId, outbound: Vec<Outbound>) {
        for Outbound { to, message } in outbound {
            match to {
                Recipients::Sender => self.send(sender, message),
                Recipients::Room => {
                    let ids = session.participants.iter().map(|p| p.id);
                    self.connections.send_to_many(ids, &message);
                }
                Recipients::Others => {
                    let ids = session
                        .participants
                        .iter()
                        .map(|p| p.id)
                        .filter(|id| *id != sender);
                    self.connections.send_to_many(ids, &message);
                }
            }
        }
    }

    fn reject(&self, id: ParticipantId, command: &SessionCommand, err: &RoomError) {
        match command.error_reply(err) {
            Some(reply) => self.send(id, reply),
            None => {
                tracing::debug!(participant_id = %id, command = command.name(), error = %err, "Command dropped");
            }
        }
    }

    fn send(&self, id: ParticipantId, message: ServerMessage) {
        if let Err(e) = self.connections.send_to(id, message) {
            tracing::debug!(participant_id = %id, error = %e, "Dropped outbound message");
        }
    }
}
