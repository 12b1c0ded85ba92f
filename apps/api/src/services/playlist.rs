//! Playlist and voting engine
//!
//! Pure state transitions over a session's queue and vote tallies. Callers
//! perform the authority checks (see [`crate::services::host`]) before
//! invoking the host-only operations here.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::RoomError;
use crate::models::{
    NewTrack, ParticipantId, PlaybackTransition, Session, Track, Vote, VoteChoice, VoteMode,
};

/// Change to the current track caused by a playlist mutation
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentChange {
    /// A new track is current; playback reset to paused at 0
    Changed(Track),
    /// Nothing left to play
    Cleared,
}

/// Result of [`add`]
#[derive(Debug, Clone, PartialEq)]
pub struct Added {
    pub track: Track,
    /// The track was auto-selected because nothing was queued or playing
    pub became_current: bool,
}

/// Result of [`remove`]
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub track: Track,
    /// Set when the removed track was the current one
    pub current: Option<CurrentChange>,
}

/// Result of [`vote`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    pub track_id: String,
    pub votes: Vec<Vote>,
    pub tally: i64,
}

/// Whether `sender` may add tracks
pub fn can_add(session: &Session, sender: ParticipantId) -> bool {
    session.host_id == sender || session.settings.collaborative_playlist
}

/// Append a track, stamping insertion order
pub fn add(
    session: &mut Session,
    sender: ParticipantId,
    new_track: NewTrack,
    now_ms: i64,
) -> Result<Added, RoomError> {
    if new_track.id.trim().is_empty() {
        return Err(RoomError::InvalidMessage("track id is required".into()));
    }
    if session.track_index(&new_track.id).is_some() {
        return Err(RoomError::DuplicateTrack(new_track.id));
    }

    let added_by = new_track
        .added_by
        .filter(|name| !name.trim().is_empty())
        .or_else(|| session.participant(sender).map(|p| p.display_name.clone()))
        .unwrap_or_default();

    let was_empty = session.playlist.is_empty();
    let track = Track {
        title: new_track
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| Track::fallback_title(&new_track.id)),
        duration: sanitize_duration(new_track.duration),
        id: new_track.id,
        added_by,
        added_by_id: Some(sender),
        added_at: now_ms,
        seq: session.next_seq(),
    };
    session.playlist.push(track.clone());

    let became_current = was_empty && session.current_track.is_none();
    if became_current {
        set_current(session, track.clone(), now_ms);
    }

    Ok(Added {
        track,
        became_current,
    })
}

/// Host loads a track directly, whether or not it is queued
///
/// A queued track is reused as is; anything else becomes current without
/// being added to the playlist.
pub fn load(
    session: &mut Session,
    sender: ParticipantId,
    new_track: NewTrack,
    now_ms: i64,
) -> Result<Track, RoomError> {
    if new_track.id.trim().is_empty() {
        return Err(RoomError::InvalidMessage("track id is required".into()));
    }

    let track = match session.track_index(&new_track.id) {
        Some(index) => session.playlist[index].clone(),
        None => Track {
            title: new_track
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| Track::fallback_title(&new_track.id)),
            duration: sanitize_duration(new_track.duration),
            added_by: session
                .participant(sender)
                .map(|p| p.display_name.clone())
                .unwrap_or_default(),
            id: new_track.id,
            added_by_id: Some(sender),
            added_at: now_ms,
            seq: session.next_seq(),
        },
    };

    set_current(session, track.clone(), now_ms);
    Ok(track)
}

/// Remove a track and its votes; `None` if it is not queued
///
/// Removing the current track selects a replacement by the same rule as
/// [`advance`], evaluated before the removal so sequential mode continues
/// with the following track.
pub fn remove(session: &mut Session, track_id: &str, now_ms: i64) -> Option<Removed> {
    let index = session.track_index(track_id)?;
    let was_current = session.current_track_id() == Some(track_id);

    let replacement = if was_current {
        select_next(session)
            .map(|i| session.playlist[i].clone())
            .filter(|next| next.id != track_id)
    } else {
        None
    };

    let track = session.playlist.remove(index);
    session.votes.remove(track_id);

    let current = if was_current {
        Some(match replacement {
            Some(next) => {
                set_current(session, next.clone(), now_ms);
                CurrentChange::Changed(next)
            }
            None => {
                session.current_track = None;
                session.clock.apply(PlaybackTransition::TrackChange, now_ms);
                CurrentChange::Cleared
            }
        })
    } else {
        None
    };

    Some(Removed { track, current })
}

/// Move one track from `from` to `to`, shifting the others
pub fn reorder(session: &mut Session, from: usize, to: usize) -> Result<(), RoomError> {
    let len = session.playlist.len();
    for index in [from, to] {
        if index >= len {
            return Err(RoomError::InvalidIndex { index, len });
        }
    }

    let track = session.playlist.remove(from);
    session.playlist.insert(to, track);
    Ok(())
}

/// Uniformly permute the whole playlist (Fisher-Yates)
pub fn shuffle<R: Rng + ?Sized>(session: &mut Session, rng: &mut R) {
    session.playlist.shuffle(rng);
}

/// Cast, toggle or retract a vote; `None` if the track or voter is unknown
///
/// Casting the value already held retracts it.
pub fn vote(
    session: &mut Session,
    voter: ParticipantId,
    track_id: &str,
    choice: VoteChoice,
) -> Option<VoteTally> {
    if session.track_index(track_id).is_none() || !session.contains(voter) {
        return None;
    }

    let votes = session.votes.entry(track_id.to_string()).or_default();
    let previous = votes.remove(&voter);
    if let Some(value) = choice.value() {
        if previous != Some(value) {
            votes.insert(voter, value);
        }
    }

    Some(VoteTally {
        track_id: track_id.to_string(),
        votes: session.votes_for(track_id),
        tally: session.tally(track_id),
    })
}

/// Index of the track `advance` would pick, if the playlist is non-empty
pub fn select_next(session: &Session) -> Option<usize> {
    if session.playlist.is_empty() {
        return None;
    }

    match session.settings.vote_mode {
        VoteMode::Sequential => Some(sequential_next(session)),
        VoteMode::Popularity => popular_next(session).or_else(|| Some(sequential_next(session))),
    }
}

/// Make the selected next track current; `None` on an empty playlist
pub fn advance(session: &mut Session, now_ms: i64) -> Option<Track> {
    let index = select_next(session)?;
    let next = session.playlist[index].clone();
    set_current(session, next.clone(), now_ms);
    Some(next)
}

/// Load `track` as current and reset playback
pub fn set_current(session: &mut Session, track: Track, now_ms: i64) {
    session.current_track = Some(track);
    session.clock.apply(PlaybackTransition::TrackChange, now_ms);
}

/// Track after the current one, wrapping; the first track if none is current
fn sequential_next(session: &Session) -> usize {
    let len = session.playlist.len();
    match session
        .current_track_id()
        .and_then(|id| session.track_index(id))
    {
        Some(current) => (current + 1) % len,
        None => 0,
    }
}

/// Highest positive tally excluding the current track; ties go to the
/// earliest inserted
fn popular_next(session: &Session) -> Option<usize> {
    let current = session.current_track_id();
    session
        .playlist
        .iter()
        .enumerate()
        .filter(|(_, track)| Some(track.id.as_str()) != current)
        .map(|(index, track)| (index, session.tally(&track.id), track.seq))
        .filter(|(_, tally, _)| *tally > 0)
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.2.cmp(&a.2)))
        .map(|(index, _, _)| index)
}

fn sanitize_duration(duration: Option<f64>) -> f64 {
    match duration {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => 0.0,
    }
}
