//! Playlist track and vote models

use serde::{Deserialize, Serialize};

use super::participant::ParticipantId;

/// Opaque media identifier supplied by clients
pub type TrackId = String;

/// A queued media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub title: String,

    /// Duration in seconds (0 when unknown)
    pub duration: f64,

    /// Display name of the participant who added the track
    pub added_by: String,

    /// Participant who added the track (absent for host-loaded tracks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by_id: Option<ParticipantId>,

    /// Unix timestamp (ms) of insertion
    pub added_at: i64,

    /// Server-assigned insertion sequence, used for popularity tie-breaks
    #[serde(default)]
    pub seq: u64,
}

impl Track {
    /// Title shown when the client does not provide one
    pub fn fallback_title(id: &str) -> String {
        format!("Track {}", id)
    }
}

/// Track fields supplied by a client before the server stamps it
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrack {
    pub id: TrackId,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub added_by: Option<String>,
}

impl NewTrack {
    pub fn new(id: impl Into<TrackId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            duration: None,
            added_by: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Value of a live vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Like,
    Dislike,
}

impl VoteValue {
    /// Contribution to a track's tally
    pub fn weight(self) -> i64 {
        match self {
            VoteValue::Like => 1,
            VoteValue::Dislike => -1,
        }
    }
}

/// A vote request: cast a value or explicitly retract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Like,
    Dislike,
    Remove,
}

impl VoteChoice {
    pub fn value(self) -> Option<VoteValue> {
        match self {
            VoteChoice::Like => Some(VoteValue::Like),
            VoteChoice::Dislike => Some(VoteValue::Dislike),
            VoteChoice::Remove => None,
        }
    }
}

/// One participant's live vote on a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub participant_id: ParticipantId,
    pub vote: VoteValue,
}
