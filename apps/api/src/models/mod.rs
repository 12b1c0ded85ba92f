//! Session state models for SyncJam
//!
//! This module contains the in-memory types for:
//! - Room codes and sessions
//! - Participants
//! - Playlist tracks and votes
//! - The authoritative playback clock

pub mod participant;
pub mod playback;
pub mod room_code;
pub mod session;
pub mod track;

pub use participant::{Participant, ParticipantId, ParticipantSummary};
pub use playback::{PlaybackClock, PlaybackState, PlaybackTransition, SyncReport};
pub use room_code::RoomCode;
pub use session::{Session, SessionSettings, VoteMode};
pub use track::{NewTrack, Track, TrackId, Vote, VoteChoice, VoteValue};

/// Current server clock as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
