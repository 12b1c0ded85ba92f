//! Session registry
//!
//! Process-scoped owner of every live session. Each session sits behind its
//! own async mutex, which is the single-writer discipline for client
//! commands, the sync heartbeat and the sweeper alike. Sessions on different
//! codes never contend.
//!
//! Lookups can race with deletion: a caller may fetch a handle, wait on its
//! lock and find the session was deleted in the meantime. [`LiveSession::is_closed`]
//! must be checked after locking, and a closed session treated as not found.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::{Participant, RoomCode, Session};

/// Session state guarded by the per-session lock
#[derive(Debug)]
pub struct LiveSession {
    pub session: Session,
    heartbeat: Option<CancellationToken>,
    closed: bool,
}

impl LiveSession {
    fn new(session: Session) -> Self {
        Self {
            session,
            heartbeat: None,
            closed: false,
        }
    }

    /// The session was deleted after this handle was looked up
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Install a heartbeat token, cancelling any previous one
    pub fn set_heartbeat(&mut self, token: CancellationToken) {
        if let Some(previous) = self.heartbeat.replace(token) {
            previous.cancel();
        }
    }

    /// Cancel the running heartbeat; false if none was running
    pub fn stop_heartbeat(&mut self) -> bool {
        match self.heartbeat.take() {
            Some(token) => {
                let was_running = !token.is_cancelled();
                token.cancel();
                was_running
            }
            None => false,
        }
    }

    fn close(&mut self) {
        self.stop_heartbeat();
        self.closed = true;
    }
}

/// Shared handle to one session
#[derive(Debug)]
pub struct SessionHandle {
    code: RoomCode,
    created_at: DateTime<Utc>,
    state: Mutex<LiveSession>,

    /// Child of the process token; parent of every timer of this session
    cancel: CancellationToken,
}

impl SessionHandle {
    fn new(session: Session, cancel: CancellationToken) -> Self {
        Self {
            code: session.code.clone(),
            created_at: session.created_at,
            state: Mutex::new(LiveSession::new(session)),
            cancel,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Acquire the session's exclusive lock
    pub async fn lock(&self) -> MutexGuard<'_, LiveSession> {
        self.state.lock().await
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Mapping from room code to live session
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<RoomCode, Arc<SessionHandle>>>,
    shutdown: CancellationToken,
}

impl SessionRegistry {
    /// Create a registry whose sessions are cancelled with `shutdown`
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            shutdown,
        }
    }

    /// Register a new session hosted by `host` under a fresh code
    ///
    /// Candidate codes are inserted through the map's entry API, so a code
    /// is never handed out twice even under concurrent creation.
    pub fn create(&self, host: Participant) -> Arc<SessionHandle> {
        let host_id = host.id;
        let mut rng = rand::thread_rng();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let code = RoomCode::generate(&mut rng);
            match self.sessions.entry(code) {
                Entry::Occupied(entry) => {
                    tracing::debug!(room = %entry.key(), attempts, "Room code collision, retrying");
                }
                Entry::Vacant(entry) => {
                    let session = Session::new(entry.key().clone(), host, Utc::now());
                    let handle = Arc::new(SessionHandle::new(
                        session,
                        self.shutdown.child_token(),
                    ));
                    entry.insert(handle.clone());

                    tracing::info!(
                        room = %handle.code(),
                        host_id = %host_id,
                        live_rooms = self.sessions.len(),
                        "Session created"
                    );
                    return handle;
                }
            }
        }
    }

    pub fn get(&self, code: &RoomCode) -> Option<Arc<SessionHandle>> {
        self.sessions.get(code).map(|entry| entry.value().clone())
    }

    /// Delete a session whose lock the caller holds
    ///
    /// Marks it closed, cancels its timers and unregisters it. A stale handle
    /// never removes a newer session that reused the same code.
    pub fn remove(&self, handle: &Arc<SessionHandle>, live: &mut LiveSession) -> bool {
        if live.is_closed() {
            return false;
        }
        live.close();
        handle.cancel.cancel();

        let removed = self
            .sessions
            .remove_if(handle.code(), |_, current| Arc::ptr_eq(current, handle))
            .is_some();

        tracing::info!(
            room = %handle.code(),
            removed,
            live_rooms = self.sessions.len(),
            "Session deleted"
        );
        removed
    }

    /// Delete every session older than `retention`
    pub async fn sweep(&self, retention: chrono::Duration) -> usize {
        self.sweep_at(retention, Utc::now()).await
    }

    /// [`Self::sweep`] evaluated at an explicit instant
    pub async fn sweep_at(&self, retention: chrono::Duration, now: DateTime<Utc>) -> usize {
        let expired: Vec<Arc<SessionHandle>> = self
            .sessions
            .iter()
            .filter(|entry| now - entry.value().created_at() > retention)
            .map(|entry| entry.value().clone())
            .collect();

        let mut swept = 0;
        for handle in expired {
            let mut live = handle.lock().await;
            if self.remove(&handle, &mut live) {
                swept += 1;
            }
        }

        if swept > 0 {
            tracing::info!(swept, remaining = self.sessions.len(), "Expired sessions swept");
        } else {
            tracing::debug!(remaining = self.sessions.len(), "Sweep found no expired sessions");
        }
        swept
    }

    /// Run [`Self::sweep`] every `interval` until the process token fires
    pub fn spawn_sweeper(&self, retention: Duration, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let retention = chrono::Duration::seconds(retention.as_secs() as i64);

        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = registry.shutdown.cancelled() => {
                        tracing::debug!("Session sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        registry.sweep(retention).await;
                    }
                }
            }
        })
    }

    /// Snapshot of all live handles
    pub fn handles(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn host() -> Participant {
        Participant::new(Uuid::new_v4(), "Host".into(), true, 0)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = SessionRegistry::new(CancellationToken::new());
        let handle = registry.create(host());

        let found = registry.get(handle.code()).unwrap();
        assert!(Arc::ptr_eq(&found, &handle));
        assert_eq!(registry.len(), 1);

        let live = found.lock().await;
        assert_eq!(live.session.participant_count(), 1);
        assert!(live.session.participants[0].is_host);
    }

    #[test]
    fn test_back_to_back_creates_yield_unique_codes() {
        let registry = SessionRegistry::new(CancellationToken::new());
        let codes: HashSet<_> = (0..2_000)
            .map(|_| registry.create(host()).code().clone())
            .collect();
        assert_eq!(codes.len(), 2_000);
        assert_eq!(registry.len(), 2_000);
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_unique_codes() {
        let registry = SessionRegistry::new(CancellationToken::new());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    (0..100)
                        .map(|_| registry.create(host()).code().clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut codes = HashSet::new();
        for task in tasks {
            codes.extend(task.await.unwrap());
        }
        assert_eq!(codes.len(), 1_600);
        assert_eq!(registry.len(), 1_600);
    }

    #[tokio::test]
    async fn test_remove_closes_and_cancels() {
        let registry = SessionRegistry::new(CancellationToken::new());
        let handle = registry.create(host());
        let heartbeat = handle.cancel_token().child_token();

        let mut live = handle.lock().await;
        live.set_heartbeat(heartbeat.clone());
        assert!(live.heartbeat_running());

        assert!(registry.remove(&handle, &mut live));
        assert!(live.is_closed());
        assert!(heartbeat.is_cancelled());
        assert!(handle.cancel_token().is_cancelled());
        assert!(registry.get(handle.code()).is_none());

        assert!(!registry.remove(&handle, &mut live));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_sessions() {
        let registry = SessionRegistry::new(CancellationToken::new());
        let old = registry.create(host());
        let retention = chrono::Duration::hours(24);

        assert_eq!(registry.sweep_at(retention, Utc::now()).await, 0);
        assert_eq!(registry.len(), 1);

        let later = old.created_at() + chrono::Duration::hours(25);
        assert_eq!(registry.sweep_at(retention, later).await, 1);
        assert!(registry.is_empty());
        assert!(old.lock().await.is_closed());
        assert!(old.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_session_tokens() {
        let shutdown = CancellationToken::new();
        let registry = SessionRegistry::new(shutdown.clone());
        let handle = registry.create(host());

        shutdown.cancel();
        assert!(handle.cancel_token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_shutdown() {
        let shutdown = CancellationToken::new();
        let registry = SessionRegistry::new(shutdown.clone());
        let sweeper = registry.spawn_sweeper(Duration::from_secs(60), Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(3)).await;
        shutdown.cancel();
        sweeper.await.unwrap();
    }
}
