//! Server-Sent Events for room lifecycle updates
//!
//! A new client first receives a `Snapshot` event carrying the full
//! registry view, then every `AutoCheckEvent` as it happens.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// GET /rooms/events - SSE event stream
pub async fn room_event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to room events");

    // Subscribe before taking the snapshot so no transition falls in between
    let mut rx = state.event_bus.subscribe();
    let snapshot = state.registry.snapshot().await;

    let stream = async_stream::stream! {
        match serde_json::to_string(&snapshot) {
            Ok(json) => yield Ok(Event::default().event("Snapshot").data(json)),
            Err(e) => warn!("SSE: Failed to serialize snapshot: {}", e),
        }

        loop {
            match rx.recv().await {
                Ok(event) => {
                    let event_type = event.event_type().to_string();
                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            debug!("SSE: Broadcasting room event: {}", event_type);
                            yield Ok(Event::default().event(event_type).data(event_json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: Client lagged, {} events skipped", skipped);
                    yield Ok(Event::default().event("Lagged").data(skipped.to_string()));
                }
                Err(RecvError::Closed) => {
                    info!("SSE: Event bus closed, ending stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
