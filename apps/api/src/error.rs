//! Error handling for the SyncJam API
//!
//! Two hierarchies, both built on thiserror:
//! - [`ApiError`] for the HTTP side-channel, mapped to status codes via
//!   Axum's `IntoResponse`
//! - [`RoomError`] for session commands arriving over WebSocket, mapped to
//!   error frames sent back to the offending connection

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client-side handling
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
}

/// HTTP API error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// Requested resource not found
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Request validation failed
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code string for client-side handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// Every variant is a client error, logged at debug
    pub fn log(&self) {
        tracing::debug!(
            error = %self,
            code = self.error_code(),
            status = self.status_code().as_u16(),
            "Client error"
        );
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let error_response = ErrorResponse {
            code: self.error_code(),
            message: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::RoomNotFound => Self::not_found("room", "unknown"),
            other => Self::ValidationError(other.to_string()),
        }
    }
}

/// Errors raised by session commands
///
/// Display strings double as the `reason` sent to clients, so they are
/// written for end users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Room code missing or not six `[A-Z0-9]` characters
    #[error("Invalid room code: {0}")]
    InvalidRoomCode(String),

    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    /// Display name empty or too long
    #[error("Invalid display name: {0}")]
    InvalidDisplayName(String),

    #[error("Username already taken")]
    UsernameTaken,

    /// Reorder index outside the playlist
    #[error("Index {index} is out of range for a playlist of {len} tracks")]
    InvalidIndex { index: usize, len: usize },

    #[error("Track {0} is already in the playlist")]
    DuplicateTrack(String),

    /// Well-formed frame with unusable content
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Host-only command from someone else; dropped without a reply
    #[error("Only the host can do that")]
    NotHost,
}

impl RoomError {
    /// Stable error code for client-side handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRoomCode(_) => "INVALID_ROOM_CODE",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::RoomFull => "ROOM_FULL",
            Self::InvalidDisplayName(_) => "INVALID_DISPLAY_NAME",
            Self::UsernameTaken => "USERNAME_TAKEN",
            Self::InvalidIndex { .. } => "INVALID_INDEX",
            Self::DuplicateTrack(_) => "DUPLICATE_TRACK",
            Self::InvalidMessage(_) => "INVALID_MESSAGE",
            Self::NotHost => "NOT_HOST",
        }
    }

    /// Errors the sender never hears about
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::NotHost | Self::RoomNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::not_found("room", "ABC123").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::ValidationError("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::not_found("room", "ABC123");
        assert_eq!(err.to_string(), "room not found: ABC123");
    }

    #[test]
    fn test_room_error_codes() {
        assert_eq!(RoomError::RoomFull.error_code(), "ROOM_FULL");
        assert_eq!(
            RoomError::InvalidIndex { index: 5, len: 3 }.error_code(),
            "INVALID_INDEX"
        );
        assert_eq!(RoomError::RoomNotFound.to_string(), "Room not found");
        assert!(RoomError::NotHost.is_silent());
        assert!(!RoomError::RoomFull.is_silent());
    }

    #[test]
    fn test_room_error_into_api_error() {
        let api: ApiError = RoomError::InvalidRoomCode("too short".into()).into();
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);

        let api: ApiError = RoomError::RoomNotFound.into();
        assert_eq!(api.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(api.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_error_response_body() {
        let response = ApiError::ValidationError("bad code".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::not_found("room", "ABC123").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
