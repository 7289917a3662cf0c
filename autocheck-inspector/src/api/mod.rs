//! HTTP API handlers for the room inspector
//!
//! REST for the four user intents (submit, retake, remove, reset) plus the
//! read-only snapshot, and SSE for live updates.

pub mod health;
pub mod rooms;
pub mod sse;

pub use health::health_routes;
pub use rooms::room_routes;
pub use sse::room_event_stream;
