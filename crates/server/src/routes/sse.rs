use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use events::{EventEnvelope, ProgressEvent, ProgressItem};
use futures::stream::{self, Stream};

use crate::state::AppState;

pub const HEARTBEAT_COMMENT: &str = "heartbeat";

/// `data:` line of an SSE frame: `{"type": <tag>, "data": <payload>}`
fn event_payload(event: &ProgressEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
}

fn envelope_to_sse_event(envelope: &EventEnvelope) -> Event {
    Event::default()
        .id(envelope.sequence.to_string())
        .event(envelope.event.event_type())
        .data(event_payload(&envelope.event))
}

/// Live progress of the active run.
///
/// Sends a heartbeat comment whenever no event arrives within the configured
/// interval. The stream ends after the run's terminal `complete` or `error`
/// event; connect again to follow the next run.
#[utoipa::path(
    get,
    path = "/api/progress",
    responses(
        (status = 200, description = "SSE progress stream"),
    ),
    tag = "analysis"
)]
pub async fn progress_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let channel = Arc::clone(&state.progress);
    let interval = state.heartbeat_interval;

    tracing::debug!(active_run = ?channel.active_run(), "Progress stream connected");

    let stream = stream::unfold(false, move |finished| {
        let channel = Arc::clone(&channel);
        async move {
            if finished {
                tracing::debug!("Progress stream finished");
                return None;
            }

            match channel.recv_timeout(interval).await {
                ProgressItem::Event(envelope) => {
                    let terminal = envelope.event.is_terminal();
                    Some((Ok(envelope_to_sse_event(&envelope)), terminal))
                }
                ProgressItem::Heartbeat => {
                    Some((Ok(Event::default().comment(HEARTBEAT_COMMENT)), false))
                }
            }
        }
    });

    Sse::new(stream)
}
