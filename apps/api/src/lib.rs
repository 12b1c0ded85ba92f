//! SyncJam API library
//!
//! This module exposes the core API components for use in integration tests
//! and as a library.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod websocket;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse, RoomError};
pub use routes::{build_router, AppState};
pub use services::SessionRegistry;
pub use websocket::Gateway;
