//! Routing of inbound frames
//!
//! Splits a [`ClientMessage`] into the session it targets and a
//! [`SessionCommand`] the handler table understands. Commands that do not
//! address an existing session are routed separately.

use crate::error::RoomError;
use crate::models::{NewTrack, PlaybackState, SessionSettings, TrackId, VoteChoice};

use super::messages::{ClientMessage, ServerMessage};

/// Where an inbound message goes
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Create { display_name: Option<String> },
    Echo { timestamp: i64 },
    Session { code: String, command: SessionCommand },
}

/// A command against one existing session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Join { display_name: Option<String> },
    Leave,
    Rename { display_name: String },
    LoadTrack(NewTrack),
    AddTrack(NewTrack),
    RemoveTrack { track_id: TrackId },
    Reorder { from_index: usize, to_index: usize },
    Shuffle,
    Vote { track_id: TrackId, choice: VoteChoice },
    Advance,
    TrackEnded,
    PlayerState { state: PlaybackState, position: f64 },
    SyncTime { state: PlaybackState, position: f64 },
    Volume { volume: i64 },
    Chat { text: String },
    UpdateSettings(SessionSettings),
    SetAudioOnly(bool),
}

impl SessionCommand {
    /// Stable name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join-room",
            Self::Leave => "leave-room",
            Self::Rename { .. } => "update-username",
            Self::LoadTrack(_) => "track-change",
            Self::AddTrack(_) => "add-to-playlist",
            Self::RemoveTrack { .. } => "remove-from-playlist",
            Self::Reorder { .. } => "reorder-playlist",
            Self::Shuffle => "shuffle-playlist",
            Self::Vote { .. } => "vote-song",
            Self::Advance => "advance",
            Self::TrackEnded => "track-ended",
            Self::PlayerState { .. } => "player-state-change",
            Self::SyncTime { .. } => "sync-time",
            Self::Volume { .. } => "update-volume",
            Self::Chat { .. } => "chat-message",
            Self::UpdateSettings(_) => "update-room-settings",
            Self::SetAudioOnly(_) => "toggle-audio-only",
        }
    }

    /// Message telling the sender why this command failed, if they are told
    ///
    /// Join failures always get a `room-join-error`, including an unknown
    /// room. Other commands stay silent for unknown rooms and
    /// unauthorised senders.
    pub fn error_reply(&self, err: &RoomError) -> Option<ServerMessage> {
        match self {
            Self::Join { .. } => Some(ServerMessage::RoomJoinError {
                reason: err.to_string(),
            }),
            _ if err.is_silent() => None,
            Self::Rename { .. } => Some(ServerMessage::UsernameError {
                reason: err.to_string(),
            }),
            _ => Some(ServerMessage::error(err)),
        }
    }
}

impl From<ClientMessage> for Routed {
    fn from(msg: ClientMessage) -> Self {
        let (code, command) = match msg {
            ClientMessage::CreateRoom { display_name } => return Routed::Create { display_name },
            ClientMessage::EchoProbe { timestamp } => return Routed::Echo { timestamp },
            ClientMessage::JoinRoom { code, display_name } => {
                (code, SessionCommand::Join { display_name })
            }
            ClientMessage::LeaveRoom { code } => (code, SessionCommand::Leave),
            ClientMessage::UpdateUsername { code, display_name } => {
                (code, SessionCommand::Rename { display_name })
            }
            ClientMessage::TrackChange {
                code,
                track_id,
                title,
                duration,
            } => (
                code,
                SessionCommand::LoadTrack(NewTrack {
                    id: track_id,
                    title,
                    duration,
                    added_by: None,
                }),
            ),
            ClientMessage::AddToPlaylist {
                code,
                track_id,
                title,
                duration,
                added_by,
            } => (
                code,
                SessionCommand::AddTrack(NewTrack {
                    id: track_id,
                    title,
                    duration,
                    added_by,
                }),
            ),
            ClientMessage::RemoveFromPlaylist { code, track_id } => {
                (code, SessionCommand::RemoveTrack { track_id })
            }
            ClientMessage::ReorderPlaylist {
                code,
                from_index,
                to_index,
            } => (
                code,
                SessionCommand::Reorder {
                    from_index,
                    to_index,
                },
            ),
            ClientMessage::ShufflePlaylist { code } => (code, SessionCommand::Shuffle),
            ClientMessage::VoteSong {
                code,
                track_id,
                vote,
            } => (
                code,
                SessionCommand::Vote {
                    track_id,
                    choice: vote,
                },
            ),
            ClientMessage::Advance { code } => (code, SessionCommand::Advance),
            ClientMessage::TrackEnded { code } => (code, SessionCommand::TrackEnded),
            ClientMessage::PlayerStateChange {
                code,
                state,
                position,
            } => (code, SessionCommand::PlayerState { state, position }),
            ClientMessage::SyncTime {
                code,
                position,
                state,
                ..
            } => (code, SessionCommand::SyncTime { state, position }),
            ClientMessage::UpdateVolume { code, volume } => {
                (code, SessionCommand::Volume { volume })
            }
            ClientMessage::ChatMessage { code, text } => (code, SessionCommand::Chat { text }),
            ClientMessage::UpdateRoomSettings { code, settings } => {
                (code, SessionCommand::UpdateSettings(settings))
            }
            ClientMessage::ToggleAudioOnly { code, audio_only } => {
                (code, SessionCommand::SetAudioOnly(audio_only))
            }
        };
        Routed::Session { code, command }
    }
}
