//! WebSocket layer for shared playback
//!
//! This module handles:
//! - The JSON message protocol
//! - Connection tracking and fan-out
//! - Routing frames to the session command table
//! - The per-session playback heartbeat

pub mod commands;
pub mod connection;
pub mod gateway;
pub mod handler;
pub mod handlers;
pub mod heartbeat;
pub mod messages;

pub use connection::{ConnectionManager, SendError};
pub use gateway::Gateway;
pub use handler::ws_handler;
pub use messages::{ClientMessage, ServerMessage};
