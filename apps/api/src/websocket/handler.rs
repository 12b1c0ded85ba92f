//! WebSocket upgrade handler
//!
//! Upgrades `GET /ws`, assigns the connection a participant id and pumps
//! frames between the socket and the gateway until either side closes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::gateway::Gateway;
use super::messages::ServerMessage;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(gateway): State<Gateway>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, gateway))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, gateway: Gateway) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let participant_id = gateway.connect(tx);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward queued messages to the socket in send order
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        tracing::debug!(participant_id = %participant_id, "WebSocket send failed");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                }
            }
        }
    });

    let recv_gateway = gateway.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    recv_gateway.handle_text(participant_id, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(participant_id = %participant_id, "Received unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pings are answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(participant_id = %participant_id, "WebSocket close received");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, participant_id = %participant_id, "WebSocket error");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete, then stop the other. The reader must
    // be fully stopped before disconnect collects the connection's rooms.
    let shutdown = gateway.registry().shutdown_token().clone();
    tokio::select! {
        _ = &mut send_task => {
            halt(recv_task).await;
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
        _ = shutdown.cancelled() => {
            tracing::debug!(participant_id = %participant_id, "Closing connection for shutdown");
            send_task.abort();
            halt(recv_task).await;
        }
    }

    gateway.disconnect(participant_id).await;
}

/// Abort a task and wait until it has stopped running
async fn halt(task: JoinHandle<()>) {
    task.abort();
    if let Err(e) = task.await {
        if e.is_panic() {
            tracing::error!(error = %e, "WebSocket task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_halt_waits_for_task_to_stop() {
        let steps = Arc::new(AtomicUsize::new(0));
        let counter = steps.clone();
        let task = tokio::spawn(async move {
            loop {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        });

        while steps.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        halt(task).await;

        let stopped_at = steps.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(steps.load(Ordering::SeqCst), stopped_at);
    }

    #[tokio::test]
    async fn test_halt_tolerates_finished_task() {
        let task = tokio::spawn(async {});
        tokio::task::yield_now().await;
        halt(task).await;
    }
}
