//! Participant lifecycle: join, rename and removal
//!
//! Leave and disconnect share [`remove`]; removing someone who is already
//! gone is a no-op so duplicate departure events are harmless.

use crate::error::RoomError;
use crate::models::participant::MAX_DISPLAY_NAME_LENGTH;
use crate::models::{Participant, ParticipantId, Session};
use crate::services::host::{self, HostChange};

/// Name given to a session creator who did not pick one
pub const DEFAULT_HOST_NAME: &str = "Host";

/// Outcome of removing a participant
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub participant: Participant,
    /// Set when the departing participant was host and someone remained
    pub host_change: Option<HostChange>,
    /// The session has no participants left and must be deleted
    pub session_empty: bool,
}

/// Outcome of a successful rename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub old_name: String,
    pub new_name: String,
}

/// Trim and bound a client-supplied display name
pub fn validate_display_name(raw: &str) -> Result<String, RoomError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(RoomError::InvalidDisplayName(
            "display name cannot be empty".into(),
        ));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(RoomError::InvalidDisplayName(format!(
            "display name must be at most {} characters",
            MAX_DISPLAY_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Name for a session creator; falls back to [`DEFAULT_HOST_NAME`]
pub fn host_display_name(requested: Option<&str>) -> Result<String, RoomError> {
    match requested {
        Some(raw) => validate_display_name(raw),
        None => Ok(DEFAULT_HOST_NAME.to_string()),
    }
}

/// Make `base` unique within the session by appending 1, 2, ...
///
/// The base is shortened when needed so the suffixed name still fits the
/// length limit.
pub fn resolve_display_name(session: &Session, base: &str) -> String {
    if !session.name_taken(base, None) {
        return base.to_string();
    }

    let mut counter: usize = 1;
    loop {
        let suffix = counter.to_string();
        let keep = MAX_DISPLAY_NAME_LENGTH.saturating_sub(suffix.len());
        let stem: String = base.chars().take(keep).collect();
        let candidate = format!("{}{}", stem, suffix);
        if !session.name_taken(&candidate, None) {
            return candidate;
        }
        counter += 1;
    }
}

/// Add a participant to the session
///
/// Joining again from a connection that is already a member returns the
/// existing participant unchanged.
pub fn join(
    session: &mut Session,
    id: ParticipantId,
    requested: Option<&str>,
    now_ms: i64,
    capacity: usize,
) -> Result<(Participant, bool), RoomError> {
    if let Some(existing) = session.participant(id) {
        return Ok((existing.clone(), false));
    }

    if session.participant_count() >= capacity {
        return Err(RoomError::RoomFull);
    }

    let base = match requested {
        Some(raw) => validate_display_name(raw)?,
        None => format!("User{}", session.participant_count() + 1),
    };
    let display_name = resolve_display_name(session, &base);

    let participant = Participant::new(id, display_name, false, now_ms);
    session.participants.push(participant.clone());

    tracing::info!(
        room = %session.code,
        participant_id = %id,
        display_name = %participant.display_name,
        participants = session.participant_count(),
        "Participant joined"
    );

    Ok((participant, true))
}

/// Rename a participant; `Ok(None)` when they are not in the session
pub fn rename(
    session: &mut Session,
    id: ParticipantId,
    raw: &str,
) -> Result<Option<Rename>, RoomError> {
    if !session.contains(id) {
        return Ok(None);
    }

    let new_name = validate_display_name(raw)?;
    if session.name_taken(&new_name, Some(id)) {
        return Err(RoomError::UsernameTaken);
    }

    let Some(participant) = session.participant_mut(id) else {
        return Ok(None);
    };
    let old_name = std::mem::replace(&mut participant.display_name, new_name.clone());

    Ok(Some(Rename { old_name, new_name }))
}

/// Remove a participant, purging their votes and failing over the host role
pub fn remove(session: &mut Session, id: ParticipantId) -> Option<Departure> {
    let participant = session.remove_participant(id)?;
    let session_empty = session.is_empty();

    let host_change = if participant.is_host && !session_empty {
        host::transfer_host(session)
    } else {
        None
    };

    tracing::info!(
        room = %session.code,
        participant_id = %id,
        display_name = %participant.display_name,
        was_host = participant.is_host,
        remaining = session.participant_count(),
        "Participant removed"
    );

    Some(Departure {
        participant,
        host_change,
        session_empty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoomCode, VoteValue};
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn session_hosted_by(name: &str) -> (Session, ParticipantId) {
        let id = Uuid::new_v4();
        let host = Participant::new(id, name.into(), true, 0);
        (
            Session::new(RoomCode::parse("JOIN01").unwrap(), host, Utc::now()),
            id,
        )
    }

    #[rstest]
    #[case("", false)]
    #[case("   ", false)]
    #[case("Alice", true)]
    #[case("  Alice  ", true)]
    #[case("abcdefghijklmnopqrst", true)]
    #[case("abcdefghijklmnopqrstu", false)]
    fn test_validate_display_name(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(validate_display_name(raw).is_ok(), ok);
    }

    #[test]
    fn test_join_deduplicates_names_case_insensitively() {
        let (mut session, _) = session_hosted_by("Alice");

        let (bob, added) = join(&mut session, Uuid::new_v4(), Some("alice"), 1, 50).unwrap();
        assert!(added);
        assert_eq!(bob.display_name, "alice1");

        let (carol, _) = join(&mut session, Uuid::new_v4(), Some("ALICE"), 2, 50).unwrap();
        assert_eq!(carol.display_name, "ALICE2");
        assert!(!carol.is_host);
    }

    #[test]
    fn test_dedup_suffix_respects_length_limit() {
        let long = "abcdefghijklmnopqrst";
        let (mut session, _) = session_hosted_by(long);
        let (p, _) = join(&mut session, Uuid::new_v4(), Some(long), 1, 50).unwrap();
        assert_eq!(p.display_name, "abcdefghijklmnopqrs1");
        assert!(p.display_name.chars().count() <= MAX_DISPLAY_NAME_LENGTH);
    }

    #[test]
    fn test_join_default_name() {
        let (mut session, _) = session_hosted_by("Alice");
        let (p, _) = join(&mut session, Uuid::new_v4(), None, 1, 50).unwrap();
        assert_eq!(p.display_name, "User2");
    }

    #[test]
    fn test_join_is_idempotent_per_connection() {
        let (mut session, _) = session_hosted_by("Alice");
        let id = Uuid::new_v4();
        join(&mut session, id, Some("Bob"), 1, 50).unwrap();
        let (again, added) = join(&mut session, id, Some("Robert"), 2, 50).unwrap();
        assert!(!added);
        assert_eq!(again.display_name, "Bob");
        assert_eq!(session.participant_count(), 2);
    }

    #[test]
    fn test_join_rejects_when_full() {
        let (mut session, _) = session_hosted_by("Alice");
        join(&mut session, Uuid::new_v4(), Some("Bob"), 1, 2).unwrap();
        let err = join(&mut session, Uuid::new_v4(), Some("Carol"), 2, 2).unwrap_err();
        assert_eq!(err, RoomError::RoomFull);
    }

    #[test]
    fn test_rename() {
        let (mut session, alice) = session_hosted_by("Alice");
        let bob = Uuid::new_v4();
        join(&mut session, bob, Some("Bob"), 1, 50).unwrap();

        assert_eq!(
            rename(&mut session, bob, "ALICE").unwrap_err(),
            RoomError::UsernameTaken
        );

        let change = rename(&mut session, alice, "alice").unwrap().unwrap();
        assert_eq!(change.old_name, "Alice");
        assert_eq!(change.new_name, "alice");

        assert!(rename(&mut session, Uuid::new_v4(), "Ghost")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_remove_host_fails_over_and_purges_votes() {
        let (mut session, alice) = session_hosted_by("Alice");
        let bob = Uuid::new_v4();
        let carol = Uuid::new_v4();
        join(&mut session, bob, Some("Bob"), 1, 50).unwrap();
        join(&mut session, carol, Some("Carol"), 2, 50).unwrap();
        session
            .votes
            .entry("t1".into())
            .or_default()
            .insert(alice, VoteValue::Like);

        let departure = remove(&mut session, alice).unwrap();
        assert!(!departure.session_empty);
        assert_eq!(departure.host_change.unwrap().new_host_id, bob);
        assert_eq!(session.tally("t1"), 0);
        assert_eq!(session.participants.iter().filter(|p| p.is_host).count(), 1);

        assert!(remove(&mut session, alice).is_none());
    }

    #[test]
    fn test_last_participant_leaving_empties_session() {
        let (mut session, alice) = session_hosted_by("Alice");
        let departure = remove(&mut session, alice).unwrap();
        assert!(departure.session_empty);
        assert!(departure.host_change.is_none());
    }
}
