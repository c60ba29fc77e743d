//! Wire events as server-sent events.
use std::convert::Infallible;

use axum::response::sse::Event;
use gita_core::WireEvent;

/// Data events carry the JSON payload; heartbeats are SSE comments so
/// clients that parse `data:` lines never see them.
pub fn to_sse(event: &WireEvent) -> Result<Event, Infallible> {
    Ok(match event.to_json() {
        Some(json) => Event::default().data(json),
        None => Event::default().comment("heartbeat"),
    })
}
