//! autocheck-inspector library interface
//!
//! Room cleanliness inspection service: users upload room photos, each is
//! assessed by a multimodal inference backend, and the session tracks every
//! room's status plus an aggregate score.

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use autocheck_common::config::DEFAULT_MAX_UPLOAD_BYTES;
use autocheck_common::events::EventBus;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::services::RoomRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The session's room registry
    pub registry: RoomRegistry,
    /// Event bus feeding the SSE stream
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Request body limit for image uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(registry: RoomRegistry, event_bus: EventBus) -> Self {
        Self {
            registry,
            event_bus,
            startup_time: Utc::now(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .merge(api::room_routes())
        .route("/rooms/events", get(api::room_event_stream))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
