//! Server-side playback heartbeat
//!
//! While a session plays, followers receive the host position extrapolated
//! from the last authoritative update on a fixed cadence. The task holds
//! only a weak reference to its session and takes the session lock for every
//! tick, like any client command.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::now_ms;
use crate::services::SessionHandle;

use super::connection::ConnectionManager;
use super::messages::ServerMessage;

/// Spawn the heartbeat for `handle`, returning its cancellation token
///
/// The token is a child of the session's token, so deleting the session
/// stops the task. The task also ends on its own once the session is no
/// longer playing, cancelling its token so the session can tell.
pub fn spawn(
    handle: &Arc<SessionHandle>,
    connections: ConnectionManager,
    period: Duration,
) -> CancellationToken {
    let token = handle.cancel_token().child_token();
    let session: Weak<SessionHandle> = Arc::downgrade(handle);
    let task_token = token.clone();
    let room = handle.code().clone();

    tokio::spawn(async move {
        tracing::debug!(room = %room, period_ms = period.as_millis() as u64, "Heartbeat started");

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(handle) = session.upgrade() else { break };
                    if !tick(&handle, &connections, &task_token).await {
                        break;
                    }
                }
            }
        }

        task_token.cancel();
        tracing::debug!(room = %room, "Heartbeat stopped");
    });

    token
}

/// Relay one extrapolated report; false when the heartbeat should end
async fn tick(
    handle: &SessionHandle,
    connections: &ConnectionManager,
    token: &CancellationToken,
) -> bool {
    let live = handle.lock().await;
    // Cancelled while waiting for the lock
    if token.is_cancelled() || live.is_closed() {
        return false;
    }

    let session = &live.session;
    if !session.clock.state.is_playing() {
        return false;
    }

    let report = session.clock.report_at(now_ms());
    let followers = session
        .participants
        .iter()
        .filter(|p| p.id != session.host_id)
        .map(|p| p.id);
    connections.send_to_many(followers, &ServerMessage::SyncTime(report));
    true
}
