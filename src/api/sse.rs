//! Server-Sent Events support

use crate::runtime::{SessionEvent, SessionSnapshot};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert a session's broadcast stream to SSE, starting with its snapshot
pub fn sse_stream(
    init: SessionSnapshot,
    broadcast_rx: tokio::sync::broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(Event::default()
            .event("init")
            .data(json!({ "type": "init", "snapshot": init }).to_string()))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(session_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn session_event_to_axum(event: SessionEvent) -> Event {
    let (event_type, data) = session_event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn session_event_payload(event: SessionEvent) -> (&'static str, serde_json::Value) {
    match event {
        SessionEvent::TurnAppended { index, turn } => (
            "turn_appended",
            json!({ "type": "turn_appended", "index": index, "turn": turn }),
        ),
        SessionEvent::RevealFrame { index, visible } => (
            "reveal_frame",
            json!({ "type": "reveal_frame", "index": index, "visible": visible }),
        ),
        SessionEvent::TurnCompleted { index, turn } => (
            "turn_completed",
            json!({ "type": "turn_completed", "index": index, "turn": turn }),
        ),
        SessionEvent::BusyChanged { busy } => (
            "busy_changed",
            json!({ "type": "busy_changed", "busy": busy }),
        ),
        SessionEvent::InputPrefilled { input } => (
            "input_prefilled",
            json!({ "type": "input_prefilled", "input": input }),
        ),
        SessionEvent::Cleared => ("cleared", json!({ "type": "cleared" })),
        SessionEvent::Closed => ("closed", json!({ "type": "closed" })),
        SessionEvent::Error { message } => (
            "error",
            json!({ "type": "error", "message": message }),
        ),
    }
}
