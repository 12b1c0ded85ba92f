//! Session command table
//!
//! Each command is a pure function of `(session, sender, command)` that
//! mutates the session and describes what should be sent to whom. No I/O
//! happens here: the gateway performs delivery, timer control and session
//! deletion from the returned [`Outcome`].

use rand::thread_rng;

use crate::error::RoomError;
use crate::models::{
    ParticipantId, PlaybackState, PlaybackTransition, Session, SessionSettings,
};
use crate::services::{host, membership, playlist};
use syncjam_shared_config::SessionConfig;

use super::commands::SessionCommand;
use super::messages::{PlaylistUpdate, RoomSnapshot, ServerMessage};

/// Who receives an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    /// Only the connection that sent the command
    Sender,
    /// Every current participant
    Room,
    /// Every current participant except the sender
    Others,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipients,
    pub message: ServerMessage,
}

/// Requested change to the session's sync heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heartbeat {
    /// Ensure it is running
    Start,
    Stop,
}

/// Membership change of the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Joined,
    Left,
}

/// Everything a command produced besides the session mutation itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub outbound: Vec<Outbound>,
    pub heartbeat: Option<Heartbeat>,
    pub membership: Option<Membership>,
    /// The last participant left; the session must be deleted
    pub session_empty: bool,
}

impl Outcome {
    fn none() -> Self {
        Self::default()
    }

    fn send(mut self, to: Recipients, message: ServerMessage) -> Self {
        self.outbound.push(Outbound { to, message });
        self
    }

    fn heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }
}

/// Inputs every handler may read besides the session
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub now_ms: i64,
    pub config: &'a SessionConfig,
}

/// Apply one command from `sender` to `session`
///
/// Commands from connections that are not participants are ignored, except
/// for joining. Host-only commands from anyone else fail with
/// [`RoomError::NotHost`] before touching state.
pub fn apply(
    session: &mut Session,
    sender: ParticipantId,
    command: SessionCommand,
    ctx: Context<'_>,
) -> Result<Outcome, RoomError> {
    let now = ctx.now_ms;

    let command = match command {
        SessionCommand::Join { display_name } => {
            return join(session, sender, display_name.as_deref(), ctx);
        }
        other => other,
    };
    if !session.contains(sender) {
        return Ok(Outcome::none());
    }

    match command {
        SessionCommand::Join { .. } => Ok(Outcome::none()),

        SessionCommand::Leave => Ok(leave(session, sender)),

        SessionCommand::Rename { display_name } => {
            let Some(change) = membership::rename(session, sender, &display_name)? else {
                return Ok(Outcome::none());
            };
            Ok(Outcome::none().send(
                Recipients::Room,
                ServerMessage::UsernameUpdated {
                    participant_id: sender,
                    old_name: change.old_name,
                    new_name: change.new_name,
                    participants: session.participants.clone(),
                },
            ))
        }

        SessionCommand::LoadTrack(new_track) => {
            require_host(session, sender)?;
            let track = playlist::load(session, sender, new_track, now)?;
            Ok(Outcome::none()
                .send(Recipients::Room, ServerMessage::track_changed(&track, now))
                .heartbeat(Heartbeat::Stop))
        }

        SessionCommand::AddTrack(new_track) => {
            if !playlist::can_add(session, sender) {
                return Err(RoomError::NotHost);
            }
            let added = playlist::add(session, sender, new_track, now)?;
            let mut outcome = Outcome::none().send(
                Recipients::Room,
                ServerMessage::PlaylistUpdated(PlaylistUpdate::added(session, added.track.clone())),
            );
            if added.became_current {
                outcome = outcome
                    .send(Recipients::Room, ServerMessage::track_changed(&added.track, now))
                    .heartbeat(Heartbeat::Stop);
            }
            Ok(outcome)
        }

        SessionCommand::RemoveTrack { track_id } => {
            require_host(session, sender)?;
            let Some(removed) = playlist::remove(session, &track_id, now) else {
                return Ok(Outcome::none());
            };
            let outcome = Outcome::none().send(
                Recipients::Room,
                ServerMessage::PlaylistUpdated(PlaylistUpdate::removed(session, removed.track.id)),
            );
            Ok(match removed.current {
                None => outcome,
                Some(playlist::CurrentChange::Changed(next)) => outcome
                    .send(Recipients::Room, ServerMessage::track_changed(&next, now))
                    .heartbeat(Heartbeat::Stop),
                Some(playlist::CurrentChange::Cleared) => outcome
                    .send(
                        Recipients::Room,
                        ServerMessage::PlayerStateChange {
                            state: PlaybackState::Paused,
                            position: 0.0,
                            server_time: now,
                        },
                    )
                    .heartbeat(Heartbeat::Stop),
            })
        }

        SessionCommand::Reorder {
            from_index,
            to_index,
        } => {
            require_host(session, sender)?;
            playlist::reorder(session, from_index, to_index)?;
            Ok(Outcome::none().send(
                Recipients::Room,
                ServerMessage::PlaylistUpdated(PlaylistUpdate::reordered(
                    session, from_index, to_index,
                )),
            ))
        }

        SessionCommand::Shuffle => {
            require_host(session, sender)?;
            playlist::shuffle(session, &mut thread_rng());
            Ok(Outcome::none().send(
                Recipients::Room,
                ServerMessage::PlaylistUpdated(PlaylistUpdate::shuffled(session)),
            ))
        }

        SessionCommand::Vote { track_id, choice } => {
            let Some(tally) = playlist::vote(session, sender, &track_id, choice) else {
                return Ok(Outcome::none());
            };
            Ok(Outcome::none().send(
                Recipients::Room,
                ServerMessage::VotesUpdated {
                    track_id: tally.track_id,
                    votes: tally.votes,
                    tally: tally.tally,
                },
            ))
        }

        SessionCommand::Advance => {
            require_host(session, sender)?;
            Ok(advance(session, now))
        }

        SessionCommand::TrackEnded => {
            require_host(session, sender)?;
            if !session.settings.auto_play_next {
                tracing::debug!(room = %session.code, "Track ended with auto-play disabled");
                return Ok(Outcome::none());
            }
            Ok(advance(session, now))
        }

        SessionCommand::PlayerState { state, position } => {
            require_host(session, sender)?;
            let transition = PlaybackTransition::from_report(session.clock.state, state, position);
            session.clock.apply(transition, now);
            let report = session.clock.report_at(now);
            Ok(Outcome::none()
                .send(
                    Recipients::Others,
                    ServerMessage::PlayerStateChange {
                        state: report.state,
                        position: report.position,
                        server_time: report.server_time,
                    },
                )
                .heartbeat(heartbeat_for(report.state)))
        }

        SessionCommand::SyncTime { state, position } => {
            require_host(session, sender)?;
            let report = session.clock.record_report(state, position, now);
            Ok(Outcome::none()
                .send(Recipients::Others, ServerMessage::SyncTime(report))
                .heartbeat(heartbeat_for(report.state)))
        }

        SessionCommand::Volume { volume } => {
            let Some(participant) = session.participant_mut(sender) else {
                return Ok(Outcome::none());
            };
            let volume = participant.set_volume(volume);
            Ok(Outcome::none().send(Recipients::Sender, ServerMessage::VolumeUpdated { volume }))
        }

        SessionCommand::Chat { text } => {
            let text = validate_chat(&text, ctx.config.max_chat_length)?;
            let Some(participant) = session.participant(sender) else {
                return Ok(Outcome::none());
            };
            Ok(Outcome::none().send(
                Recipients::Room,
                ServerMessage::ChatMessage {
                    participant: participant.summary(),
                    text,
                    timestamp: now,
                },
            ))
        }

        SessionCommand::UpdateSettings(settings) => {
            require_host(session, sender)?;
            Ok(update_settings(session, settings))
        }

        SessionCommand::SetAudioOnly(audio_only) => {
            require_host(session, sender)?;
            session.audio_only = audio_only;
            Ok(Outcome::none().send(
                Recipients::Room,
                ServerMessage::AudioOnlyChanged { audio_only },
            ))
        }
    }
}

fn require_host(session: &Session, sender: ParticipantId) -> Result<(), RoomError> {
    if host::enforce_authority(session, sender) {
        Ok(())
    } else {
        Err(RoomError::NotHost)
    }
}

fn heartbeat_for(state: PlaybackState) -> Heartbeat {
    if state.is_playing() {
        Heartbeat::Start
    } else {
        Heartbeat::Stop
    }
}

fn join(
    session: &mut Session,
    sender: ParticipantId,
    display_name: Option<&str>,
    ctx: Context<'_>,
) -> Result<Outcome, RoomError> {
    let (participant, added) = membership::join(
        session,
        sender,
        display_name,
        ctx.now_ms,
        ctx.config.max_participants,
    )?;

    let snapshot = RoomSnapshot::capture(session, &participant, ctx.now_ms);
    let mut outcome = Outcome::none().send(
        Recipients::Sender,
        ServerMessage::RoomJoined(Box::new(snapshot)),
    );
    if added {
        outcome = outcome.send(
            Recipients::Others,
            ServerMessage::ParticipantJoined {
                participant,
                participants: session.participants.clone(),
            },
        );
        outcome.membership = Some(Membership::Joined);
    }
    Ok(outcome)
}

fn leave(session: &mut Session, sender: ParticipantId) -> Outcome {
    let Some(departure) = membership::remove(session, sender) else {
        return Outcome::none();
    };

    let mut outcome = Outcome {
        membership: Some(Membership::Left),
        session_empty: departure.session_empty,
        ..Outcome::none()
    };
    if departure.session_empty {
        return outcome.heartbeat(Heartbeat::Stop);
    }

    outcome = outcome.send(
        Recipients::Room,
        ServerMessage::ParticipantLeft {
            participant: departure.participant.summary(),
            participants: session.participants.clone(),
        },
    );
    if let Some(change) = departure.host_change {
        outcome = outcome
            .send(
                Recipients::Room,
                ServerMessage::HostChanged {
                    new_host_id: change.new_host_id,
                    participants: session.participants.clone(),
                },
            )
            .heartbeat(Heartbeat::Stop);
    }
    outcome
}

fn advance(session: &mut Session, now_ms: i64) -> Outcome {
    match playlist::advance(session, now_ms) {
        Some(next) => Outcome::none()
            .send(Recipients::Room, ServerMessage::track_changed(&next, now_ms))
            .heartbeat(Heartbeat::Stop),
        None => Outcome::none(),
    }
}

fn update_settings(session: &mut Session, settings: SessionSettings) -> Outcome {
    session.settings = settings;
    tracing::info!(
        room = %session.code,
        collaborative = settings.collaborative_playlist,
        vote_mode = ?settings.vote_mode,
        auto_play_next = settings.auto_play_next,
        "Room settings updated"
    );
    Outcome::none().send(
        Recipients::Room,
        ServerMessage::RoomSettingsUpdated { settings },
    )
}

fn validate_chat(raw: &str, max_len: usize) -> Result<String, RoomError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(RoomError::InvalidMessage("chat message cannot be empty".into()));
    }
    if text.chars().count() > max_len {
        return Err(RoomError::InvalidMessage(format!(
            "chat message must be at most {} characters",
            max_len
        )));
    }
    Ok(text.to_string())
}
