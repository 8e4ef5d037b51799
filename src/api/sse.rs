//! Server-Sent Events support

use crate::agent::AgentEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::DropGuard;

/// Convert a run's event channel into an SSE response.
///
/// `on_disconnect` lives as long as the stream; dropping the response body
/// (client gone) cancels the run behind it.
pub fn sse_stream(
    events: mpsc::Receiver<AgentEvent>,
    on_disconnect: DropGuard,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = ReceiverStream::new(events).map(move |event| {
        let _armed = &on_disconnect;
        Ok(agent_event_to_axum(&event))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn agent_event_to_axum(event: &AgentEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize SSE event");
        r#"{"type":"error","message":"INTERNAL_ERROR: event serialization failed"}"#.to_string()
    });
    Event::default().event(event.name()).data(data)
}
