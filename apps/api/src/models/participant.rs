//! Session participant model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Participant identifier, one per WebSocket connection
pub type ParticipantId = Uuid;

/// Maximum display name length in characters
pub const MAX_DISPLAY_NAME_LENGTH: usize = 20;

/// Default per-client volume
pub const DEFAULT_VOLUME: u8 = 100;

/// A member of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,

    /// Unique within the session under case-folding
    pub display_name: String,

    pub is_host: bool,

    /// Unix timestamp (ms) of the join; defines failover order
    pub joined_at: i64,

    /// Client volume 0-100, held for host monitoring only
    pub volume: u8,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: String, is_host: bool, joined_at: i64) -> Self {
        Self {
            id,
            display_name,
            is_host,
            joined_at,
            volume: DEFAULT_VOLUME,
        }
    }

    /// Set the volume, clamping into 0-100
    pub fn set_volume(&mut self, volume: i64) -> u8 {
        self.volume = volume.clamp(0, 100) as u8;
        self.volume
    }

    /// Lightweight identity used in chat and departure events
    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id,
            display_name: self.display_name.clone(),
        }
    }
}

/// Participant identity without session-specific state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub display_name: String,
}
