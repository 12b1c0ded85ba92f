//! Session statistics routes
//!
//! Read-only; every summary is taken under the session's lock.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::models::RoomCode;
use crate::services::{HealthService, RoomSummary, StatsReport};

/// `GET /api/stats`
pub async fn stats(State(service): State<HealthService>) -> Json<StatsReport> {
    Json(service.stats().await)
}

/// `GET /api/stats/:code`
pub async fn room_stats(
    State(service): State<HealthService>,
    Path(raw_code): Path<String>,
) -> ApiResult<Json<RoomSummary>> {
    let code = RoomCode::parse(&raw_code)?;
    service
        .room(&code)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("room", code.as_str()))
}
