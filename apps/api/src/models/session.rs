//! Shared-playback session model
//!
//! A session is the unit of exclusivity: every mutation happens while the
//! caller holds the session's lock, so the methods here are plain `&mut self`
//! state transitions with no I/O.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::participant::{Participant, ParticipantId};
use super::playback::PlaybackClock;
use super::room_code::RoomCode;
use super::track::{Track, TrackId, Vote, VoteValue};

/// How `advance` picks the next track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteMode {
    #[default]
    Sequential,
    Popularity,
}

/// Host-controlled session settings; missing fields take their defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Allow non-host participants to add tracks
    pub collaborative_playlist: bool,
    pub vote_mode: VoteMode,
    /// Advance automatically when the host reports end of track
    pub auto_play_next: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            collaborative_playlist: false,
            vote_mode: VoteMode::Sequential,
            auto_play_next: true,
        }
    }
}

/// A shared-playback session
#[derive(Debug, Clone)]
pub struct Session {
    pub code: RoomCode,
    pub host_id: ParticipantId,

    /// Participants in join order
    pub participants: Vec<Participant>,

    pub playlist: Vec<Track>,

    /// track id -> (participant id -> vote)
    pub votes: HashMap<TrackId, BTreeMap<ParticipantId, VoteValue>>,

    /// Track currently loaded by the host
    pub current_track: Option<Track>,

    pub clock: PlaybackClock,
    pub settings: SessionSettings,
    pub audio_only: bool,
    pub created_at: DateTime<Utc>,

    /// Next insertion sequence number for the playlist
    next_track_seq: u64,
}

impl Session {
    /// Create a session whose first participant is its host
    pub fn new(code: RoomCode, host: Participant, created_at: DateTime<Utc>) -> Self {
        let mut host = host;
        host.is_host = true;
        let now_ms = created_at.timestamp_millis();

        Self {
            code,
            host_id: host.id,
            participants: vec![host],
            playlist: Vec::new(),
            votes: HashMap::new(),
            current_track: None,
            clock: PlaybackClock::new(now_ms),
            settings: SessionSettings::default(),
            audio_only: false,
            created_at,
            next_track_seq: 0,
        }
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participant(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participant(self.host_id)
    }

    /// Remaining participant with the earliest join
    ///
    /// Ordered by `joined_at`, then by position in the join-ordered list when
    /// two joins land in the same millisecond.
    pub fn earliest_joined(&self) -> Option<&Participant> {
        self.participants
            .iter()
            .enumerate()
            .min_by_key(|(index, p)| (p.joined_at, *index))
            .map(|(_, p)| p)
    }

    /// Whether `name` collides case-insensitively with another participant
    pub fn name_taken(&self, name: &str, except: Option<ParticipantId>) -> bool {
        let folded = name.to_lowercase();
        self.participants
            .iter()
            .filter(|p| Some(p.id) != except)
            .any(|p| p.display_name.to_lowercase() == folded)
    }

    /// Remove a participant and every vote they cast
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        let participant = self.participants.remove(index);
        for votes in self.votes.values_mut() {
            votes.remove(&id);
        }
        Some(participant)
    }

    pub fn track_index(&self, track_id: &str) -> Option<usize> {
        self.playlist.iter().position(|t| t.id == track_id)
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }

    /// Take the next insertion sequence number
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next_track_seq;
        self.next_track_seq += 1;
        seq
    }

    /// likes minus dislikes for a track
    pub fn tally(&self, track_id: &str) -> i64 {
        self.votes
            .get(track_id)
            .map(|votes| votes.values().map(|v| v.weight()).sum())
            .unwrap_or(0)
    }

    /// Live votes on a track, ordered by participant id
    pub fn votes_for(&self, track_id: &str) -> Vec<Vote> {
        self.votes
            .get(track_id)
            .map(|votes| {
                votes
                    .iter()
                    .map(|(participant_id, vote)| Vote {
                        participant_id: *participant_id,
                        vote: *vote,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Age of the session relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}
