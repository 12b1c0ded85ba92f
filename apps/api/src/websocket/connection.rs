//! WebSocket connection management
//!
//! Tracks every live connection by its participant id, together with the
//! rooms it has joined so a disconnect can run the leave path for each.

use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::{ParticipantId, RoomCode};

use super::messages::ServerMessage;

/// Errors delivering to a connection
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("connection not found")]
    ConnectionNotFound,

    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle for sending messages to a specific WebSocket connection
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Channel drained by the connection's writer task
    pub sender: mpsc::UnboundedSender<ServerMessage>,

    /// Rooms this connection is a participant of
    rooms: DashSet<RoomCode>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            sender,
            rooms: DashSet::new(),
        }
    }

    #[allow(clippy::result_large_err)]
    pub fn send(&self, msg: ServerMessage) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.sender.send(msg)
    }
}

/// Manages WebSocket connections for all participants
///
/// Wrapped in Arc for cheap cloning; DashMap gives concurrent access without
/// a global lock.
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    connections: Arc<DashMap<ParticipantId, ConnectionHandle>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_connection(&self, id: ParticipantId, sender: mpsc::UnboundedSender<ServerMessage>) {
        self.connections.insert(id, ConnectionHandle::new(sender));
        tracing::debug!(
            participant_id = %id,
            connections = self.connections.len(),
            "Connection added"
        );
    }

    /// Remove a connection, returning the rooms it had joined
    pub fn remove_connection(&self, id: ParticipantId) -> Vec<RoomCode> {
        match self.connections.remove(&id) {
            Some((_, handle)) => {
                tracing::debug!(participant_id = %id, "Connection removed");
                handle.rooms.into_iter().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn is_connected(&self, id: ParticipantId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Record that `id` joined `code`
    pub fn join_room(&self, id: ParticipantId, code: &RoomCode) {
        if let Some(handle) = self.connections.get(&id) {
            handle.rooms.insert(code.clone());
        }
    }

    pub fn leave_room(&self, id: ParticipantId, code: &RoomCode) {
        if let Some(handle) = self.connections.get(&id) {
            handle.rooms.remove(code);
        }
    }

    pub fn rooms_of(&self, id: ParticipantId) -> Vec<RoomCode> {
        self.connections
            .get(&id)
            .map(|handle| handle.rooms.iter().map(|code| code.clone()).collect())
            .unwrap_or_default()
    }

    pub fn send_to(&self, id: ParticipantId, msg: ServerMessage) -> Result<(), SendError> {
        let handle = self
            .connections
            .get(&id)
            .ok_or(SendError::ConnectionNotFound)?;
        handle.send(msg).map_err(|_| SendError::ConnectionClosed)
    }

    /// Fire-and-forget fan-out; returns how many sends succeeded
    pub fn send_to_many<I>(&self, ids: I, msg: &ServerMessage) -> usize
    where
        I: IntoIterator<Item = ParticipantId>,
    {
        let mut sent = 0;
        for id in ids {
            match self.send_to(id, msg.clone()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::debug!(participant_id = %id, error = %e, "Dropped outbound message");
                }
            }
        }
        sent
    }

    pub fn total_connections(&self) -> usize {
        self.connections.len()
    }
}
