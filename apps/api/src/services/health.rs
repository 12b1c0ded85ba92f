//! Health and statistics reporting
//!
//! Read-only views over the session registry for the HTTP side-channel:
//! - a cheap health summary (live room count, uptime)
//! - aggregate stats with one summary per session

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{RoomCode, Session};
use crate::services::registry::{SessionHandle, SessionRegistry};

/// Body of `GET /api/health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    /// Live session count
    pub rooms: usize,
    /// Process uptime in seconds
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-session summary in the stats report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub code: RoomCode,
    /// Participant count
    pub users: usize,
    /// Display name of the current host
    pub host: Option<String>,
    pub playlist_length: usize,
    /// Title of the current track
    pub current_track: Option<String>,
    pub audio_only: bool,
    pub created_at: DateTime<Utc>,
}

impl RoomSummary {
    pub fn from_session(session: &Session) -> Self {
        Self {
            code: session.code.clone(),
            users: session.participant_count(),
            host: session.host().map(|p| p.display_name.clone()),
            playlist_length: session.playlist.len(),
            current_track: session.current_track.as_ref().map(|t| t.title.clone()),
            audio_only: session.audio_only,
            created_at: session.created_at,
        }
    }
}

/// Body of `GET /api/stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub total_rooms: usize,
    pub total_users: usize,
    pub rooms: Vec<RoomSummary>,
}

impl StatsReport {
    pub fn new(mut rooms: Vec<RoomSummary>) -> Self {
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.code.cmp(&b.code)));
        Self {
            total_rooms: rooms.len(),
            total_users: rooms.iter().map(|r| r.users).sum(),
            rooms,
        }
    }
}

/// Builds health and stats reports from the live registry
#[derive(Debug, Clone)]
pub struct HealthService {
    registry: SessionRegistry,
    started_at: Instant,
}

impl HealthService {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            registry,
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Liveness summary; does not lock any session
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            rooms: self.registry.len(),
            uptime: self.uptime().as_secs_f64(),
            timestamp: Utc::now(),
        }
    }

    /// Aggregate stats, locking each session briefly in turn
    pub async fn stats(&self) -> StatsReport {
        let mut rooms = Vec::with_capacity(self.registry.len());
        for handle in self.registry.handles() {
            if let Some(summary) = summarize(&handle).await {
                rooms.push(summary);
            }
        }
        StatsReport::new(rooms)
    }

    /// Summary of one session, `None` if it is not live
    pub async fn room(&self, code: &RoomCode) -> Option<RoomSummary> {
        let handle = self.registry.get(code)?;
        summarize(&handle).await
    }
}

async fn summarize(handle: &SessionHandle) -> Option<RoomSummary> {
    let live = handle.lock().await;
    if live.is_closed() {
        return None;
    }
    Some(RoomSummary::from_session(&live.session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTrack, Participant};
    use crate::services::playlist;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn host(name: &str) -> Participant {
        Participant::new(Uuid::new_v4(), name.into(), true, 0)
    }

    #[tokio::test]
    async fn test_health_counts_rooms() {
        let registry = SessionRegistry::new(CancellationToken::new());
        let service = HealthService::new(registry.clone());
        assert_eq!(service.health().rooms, 0);

        registry.create(host("Alice"));
        registry.create(host("Bob"));

        let report = service.health();
        assert_eq!(report.status, "ok");
        assert_eq!(report.rooms, 2);
        assert!(report.uptime >= 0.0);
    }

    #[tokio::test]
    async fn test_stats_summarise_sessions() {
        let registry = SessionRegistry::new(CancellationToken::new());
        let service = HealthService::new(registry.clone());

        let handle = registry.create(host("Alice"));
        {
            let mut live = handle.lock().await;
            let host_id = live.session.host_id;
            playlist::add(
                &mut live.session,
                host_id,
                NewTrack::new("abc").with_title("Opening"),
                0,
            )
            .unwrap();
        }
        registry.create(host("Bob"));

        let stats = service.stats().await;
        assert_eq!(stats.total_rooms, 2);
        assert_eq!(stats.total_users, 2);

        let alice = service.room(handle.code()).await.unwrap();
        assert_eq!(alice.host.as_deref(), Some("Alice"));
        assert_eq!(alice.playlist_length, 1);
        assert_eq!(alice.current_track.as_deref(), Some("Opening"));
        assert!(!alice.audio_only);
    }

    #[tokio::test]
    async fn test_stats_skip_deleted_sessions() {
        let registry = SessionRegistry::new(CancellationToken::new());
        let service = HealthService::new(registry.clone());
        let handle = registry.create(host("Alice"));
        {
            let mut live = handle.lock().await;
            registry.remove(&handle, &mut live);
        }

        assert!(service.room(handle.code()).await.is_none());
        assert_eq!(service.stats().await.total_rooms, 0);
    }
}
