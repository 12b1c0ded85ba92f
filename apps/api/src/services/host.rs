//! Host authority
//!
//! Exactly one participant of a non-empty session is the host. Host-only
//! commands from anyone else are dropped without a state change; when the
//! host leaves, the role passes to the earliest remaining joiner.

use serde::Serialize;

use crate::models::{ParticipantId, Session};

/// Result of a host failover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostChange {
    pub previous_host_id: ParticipantId,
    pub new_host_id: ParticipantId,
}

/// True iff `sender` is the session's current host
pub fn enforce_authority(session: &Session, sender: ParticipantId) -> bool {
    session.host_id == sender
}

/// Hand the host role to the earliest remaining joiner
///
/// Only valid once the previous host has been removed; returns `None` if the
/// host is still present or the session is empty.
pub fn transfer_host(session: &mut Session) -> Option<HostChange> {
    if session.contains(session.host_id) {
        tracing::warn!(
            room = %session.code,
            host_id = %session.host_id,
            "Host transfer requested while host is still present"
        );
        return None;
    }

    let previous_host_id = session.host_id;
    let new_host_id = session.earliest_joined()?.id;

    for participant in session.participants.iter_mut() {
        participant.is_host = participant.id == new_host_id;
    }
    session.host_id = new_host_id;

    tracing::info!(
        room = %session.code,
        previous_host_id = %previous_host_id,
        new_host_id = %new_host_id,
        "Host role transferred"
    );

    Some(HostChange {
        previous_host_id,
        new_host_id,
    })
}
