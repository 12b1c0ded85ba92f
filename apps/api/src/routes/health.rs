//! Health check HTTP route handlers
//!
//! - `GET /api/health` - Session-aware health summary
//! - `GET /health/live` - Kubernetes-style liveness probe

use axum::{extract::State, response::IntoResponse, Json};

use crate::services::{HealthReport, HealthService};

/// Health summary: live room count, uptime and server time
///
/// Never locks a session, so it stays responsive under load.
pub async fn health(State(service): State<HealthService>) -> Json<HealthReport> {
    Json(service.health())
}

/// Liveness probe for Kubernetes
///
/// Returns 200 if the server process is running and can handle requests.
pub async fn liveness_probe() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SessionRegistry;
    use axum::http::StatusCode;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_liveness_probe() {
        let response = liveness_probe().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let service = HealthService::new(SessionRegistry::new(CancellationToken::new()));
        let Json(report) = health(State(service)).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.rooms, 0);
    }
}
