//! WebSocket message types for shared playback
//!
//! This module defines the message protocol for client-server communication
//! over WebSocket connections. Messages are serialized as JSON envelopes of
//! the form `{"type": "kebab-case-name", "payload": {...camelCase fields}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RoomError;
use crate::models::{
    Participant, ParticipantId, ParticipantSummary, PlaybackState, RoomCode, Session,
    SessionSettings, SyncReport, Track, TrackId, Vote, VoteChoice,
};

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Messages sent from client to server
///
/// Room codes arrive as raw strings and are normalised by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    CreateRoom {
        #[serde(default)]
        display_name: Option<String>,
    },

    JoinRoom {
        code: String,
        #[serde(default)]
        display_name: Option<String>,
    },

    LeaveRoom {
        code: String,
    },

    UpdateUsername {
        code: String,
        display_name: String,
    },

    /// Host loads a track directly
    TrackChange {
        code: String,
        track_id: TrackId,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        duration: Option<f64>,
    },

    AddToPlaylist {
        code: String,
        track_id: TrackId,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        duration: Option<f64>,
        #[serde(default)]
        added_by: Option<String>,
    },

    RemoveFromPlaylist {
        code: String,
        track_id: TrackId,
    },

    ReorderPlaylist {
        code: String,
        from_index: usize,
        to_index: usize,
    },

    ShufflePlaylist {
        code: String,
    },

    VoteSong {
        code: String,
        track_id: TrackId,
        vote: VoteChoice,
    },

    /// Explicit "next"
    Advance {
        code: String,
    },

    /// Host player reached the end of the current track
    TrackEnded {
        code: String,
    },

    PlayerStateChange {
        code: String,
        state: PlaybackState,
        position: f64,
    },

    /// Periodic host position report
    SyncTime {
        code: String,
        position: f64,
        state: PlaybackState,
        #[serde(default)]
        client_send_time: Option<i64>,
    },

    UpdateVolume {
        code: String,
        volume: i64,
    },

    ChatMessage {
        code: String,
        text: String,
    },

    UpdateRoomSettings {
        code: String,
        #[serde(default)]
        settings: SessionSettings,
    },

    ToggleAudioOnly {
        code: String,
        audio_only: bool,
    },

    /// Latency probe; echoed back unmodified
    EchoProbe {
        timestamp: i64,
    },
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Greeting on connect; clients derive their clock offset from it
    ServerTime {
        server_time: i64,
        participant_id: ParticipantId,
    },

    RoomCreated {
        code: RoomCode,
        display_name: String,
        participant_id: ParticipantId,
    },

    RoomJoined(Box<RoomSnapshot>),

    RoomJoinError {
        reason: String,
    },

    ParticipantJoined {
        participant: Participant,
        participants: Vec<Participant>,
    },

    ParticipantLeft {
        participant: ParticipantSummary,
        participants: Vec<Participant>,
    },

    UsernameUpdated {
        participant_id: ParticipantId,
        old_name: String,
        new_name: String,
        participants: Vec<Participant>,
    },

    UsernameError {
        reason: String,
    },

    HostChanged {
        new_host_id: ParticipantId,
        participants: Vec<Participant>,
    },

    TrackChanged {
        track_id: TrackId,
        title: String,
        duration: f64,
        server_time: i64,
    },

    PlaylistUpdated(PlaylistUpdate),

    VotesUpdated {
        track_id: TrackId,
        votes: Vec<Vote>,
        tally: i64,
    },

    PlayerStateChange {
        state: PlaybackState,
        position: f64,
        server_time: i64,
    },

    SyncTime(SyncReport),

    VolumeUpdated {
        volume: u8,
    },

    ChatMessage {
        participant: ParticipantSummary,
        text: String,
        timestamp: i64,
    },

    RoomSettingsUpdated {
        settings: SessionSettings,
    },

    AudioOnlyChanged {
        audio_only: bool,
    },

    EchoResponse {
        timestamp: i64,
    },

    Error(ErrorPayload),
}

impl ServerMessage {
    pub fn track_changed(track: &Track, server_time: i64) -> Self {
        Self::TrackChanged {
            track_id: track.id.clone(),
            title: track.title.clone(),
            duration: track.duration,
            server_time,
        }
    }

    pub fn error(err: &RoomError) -> Self {
        Self::Error(ErrorPayload::from(err))
    }
}

// =============================================================================
// Payload Types
// =============================================================================

/// Full session state sent to a participant on join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub display_name: String,
    pub participant_id: ParticipantId,
    pub is_host: bool,
    pub participants: Vec<Participant>,
    pub playlist: Vec<Track>,
    pub current_track: Option<Track>,
    pub playback_state: PlaybackState,
    /// Host position extrapolated to `server_time`
    pub playback_position: f64,
    pub server_time: i64,
    pub settings: SessionSettings,
    pub audio_only: bool,
    /// track id -> tally, for tracks with live votes
    pub tallies: BTreeMap<TrackId, i64>,
}

impl RoomSnapshot {
    /// Snapshot of `session` as seen by `participant` at `now_ms`
    pub fn capture(session: &Session, participant: &Participant, now_ms: i64) -> Self {
        let tallies = session
            .votes
            .iter()
            .filter(|(_, votes)| !votes.is_empty())
            .map(|(track_id, _)| (track_id.clone(), session.tally(track_id)))
            .collect();

        Self {
            code: session.code.clone(),
            display_name: participant.display_name.clone(),
            participant_id: participant.id,
            is_host: participant.id == session.host_id,
            participants: session.participants.clone(),
            playlist: session.playlist.clone(),
            current_track: session.current_track.clone(),
            playback_state: session.clock.state,
            playback_position: session.clock.position_at(now_ms),
            server_time: now_ms,
            settings: session.settings,
            audio_only: session.audio_only,
            tallies,
        }
    }
}

/// Reorder delta of a playlist update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reordered {
    pub from_index: usize,
    pub to_index: usize,
}

/// New playlist plus the change that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistUpdate {
    pub playlist: Vec<Track>,
    pub current_track_id: Option<TrackId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<Track>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<TrackId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reordered: Option<Reordered>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub shuffled: bool,
}

impl PlaylistUpdate {
    fn of(session: &Session) -> Self {
        Self {
            playlist: session.playlist.clone(),
            current_track_id: session.current_track_id().map(String::from),
            added: None,
            removed: None,
            reordered: None,
            shuffled: false,
        }
    }

    pub fn added(session: &Session, track: Track) -> Self {
        Self {
            added: Some(track),
            ..Self::of(session)
        }
    }

    pub fn removed(session: &Session, track_id: TrackId) -> Self {
        Self {
            removed: Some(track_id),
            ..Self::of(session)
        }
    }

    pub fn reordered(session: &Session, from_index: usize, to_index: usize) -> Self {
        Self {
            reordered: Some(Reordered {
                from_index,
                to_index,
            }),
            ..Self::of(session)
        }
    }

    pub fn shuffled(session: &Session) -> Self {
        Self {
            shuffled: true,
            ..Self::of(session)
        }
    }
}

/// Payload for Error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::new("INVALID_MESSAGE", message)
    }
}

impl From<&RoomError> for ErrorPayload {
    fn from(err: &RoomError) -> Self {
        Self::new(err.error_code(), err.to_string())
    }
}
