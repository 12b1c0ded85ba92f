//! Authoritative playback clock
//!
//! The server keeps the host's last reported position together with the
//! server time at which it was received. While playing, the position advances
//! with wall-clock time; while paused it is frozen.

use serde::{Deserialize, Serialize};

/// Playback state machine states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Paused,
    Playing,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// Host-authored transitions of the playback state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackTransition {
    Play { position: f64 },
    Pause { position: f64 },
    /// Move the position without touching the state
    Seek { position: f64 },
    /// A new track was loaded; state resets to paused at 0
    TrackChange,
}

impl PlaybackTransition {
    /// Derive the transition implied by a host report of `(state, position)`
    pub fn from_report(current: PlaybackState, state: PlaybackState, position: f64) -> Self {
        match (current, state) {
            (PlaybackState::Paused, PlaybackState::Playing) => Self::Play { position },
            (PlaybackState::Playing, PlaybackState::Paused) => Self::Pause { position },
            _ => Self::Seek { position },
        }
    }
}

/// Position report stamped with the server's receipt time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Host position in seconds at `server_time`
    pub position: f64,
    pub state: PlaybackState,
    /// Server clock (Unix ms) when the report was received
    pub server_time: i64,
}

/// Playback position and state of a session
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackClock {
    pub state: PlaybackState,

    /// Position in seconds as of `last_update`
    pub position: f64,

    /// Server clock (Unix ms) at the last authoritative update
    pub last_update: i64,
}

impl PlaybackClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            state: PlaybackState::Paused,
            position: 0.0,
            last_update: now_ms,
        }
    }

    /// Apply a host-authored transition at server time `now_ms`
    pub fn apply(&mut self, transition: PlaybackTransition, now_ms: i64) {
        match transition {
            PlaybackTransition::Play { position } => {
                self.state = PlaybackState::Playing;
                self.position = sanitize_position(position);
            }
            PlaybackTransition::Pause { position } => {
                self.state = PlaybackState::Paused;
                self.position = sanitize_position(position);
            }
            PlaybackTransition::Seek { position } => {
                self.position = sanitize_position(position);
            }
            PlaybackTransition::TrackChange => {
                self.state = PlaybackState::Paused;
                self.position = 0.0;
            }
        }
        self.last_update = now_ms;
    }

    /// Record a host report and return it stamped with the receipt time
    pub fn record_report(&mut self, state: PlaybackState, position: f64, now_ms: i64) -> SyncReport {
        let transition = PlaybackTransition::from_report(self.state, state, position);
        self.apply(transition, now_ms);
        self.report_at(now_ms)
    }

    /// Position extrapolated to `now_ms`; advances only while playing
    pub fn position_at(&self, now_ms: i64) -> f64 {
        match self.state {
            PlaybackState::Playing => {
                let elapsed_ms = (now_ms - self.last_update).max(0);
                self.position + elapsed_ms as f64 / 1000.0
            }
            PlaybackState::Paused => self.position,
        }
    }

    /// Snapshot of the clock as a report stamped at `now_ms`
    pub fn report_at(&self, now_ms: i64) -> SyncReport {
        SyncReport {
            position: self.position_at(now_ms),
            state: self.state,
            server_time: now_ms,
        }
    }
}

/// Positions are seconds from track start; reject NaN and negatives
fn sanitize_position(position: f64) -> f64 {
    if position.is_finite() && position > 0.0 {
        position
    } else {
        0.0
    }
}
