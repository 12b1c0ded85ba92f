//! HTTP routes for the SyncJam server
//!
//! This module wires together:
//! - The WebSocket endpoint (`/ws`)
//! - Health and liveness probes
//! - Read-only session statistics

pub mod health;
pub mod stats;

use axum::{extract::FromRef, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::services::{HealthService, SessionRegistry};
use crate::websocket::{ws_handler, Gateway};
use syncjam_shared_config::SessionConfig;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub health: HealthService,
}

impl AppState {
    /// Build the state around a registry
    pub fn new(registry: SessionRegistry, config: SessionConfig) -> Self {
        Self {
            health: HealthService::new(registry.clone()),
            gateway: Gateway::new(registry, config),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        self.gateway.registry()
    }
}

impl FromRef<AppState> for Gateway {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

impl FromRef<AppState> for HealthService {
    fn from_ref(state: &AppState) -> Self {
        state.health.clone()
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/health", get(health::health))
        .route("/api/stats", get(stats::stats))
        .route("/api/stats/:code", get(stats::room_stats))
        .route("/health/live", get(health::liveness_probe))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
