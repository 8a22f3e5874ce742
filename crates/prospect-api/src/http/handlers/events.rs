//! SSE reply stream endpoint.
//!
//! GET /api/v1/chats/{chat_id}/events
//!
//! Subscribes to the in-process reply channel for one chat and forwards
//! every outbound customer reply as an SSE event. Greetings and batch
//! replies arrive on the same stream; `reply_to` correlates a reply with
//! the salesperson message that triggered it.
//!
//! SSE event types:
//! - `reply` -- a serialized `OutboundReply`:
//!   `{ "chat_id": N, "text": "...", "reply_to": "..." | null }`

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::http::error::AppError;
use crate::state::AppState;

/// GET /api/v1/chats/{chat_id}/events - Live reply stream for a chat.
///
/// Subscribing before the session starts is fine; the channel is created
/// on first touch. A consumer that falls behind the channel buffer loses
/// the oldest replies and resumes from the most recent.
pub async fn chat_events(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let chat_id = super::parse_chat_id(&chat_id)?;
    let rx = state.events.subscribe(chat_id);

    let stream = BroadcastStream::new(rx).filter_map(move |next| match next {
        Ok(reply) => match serde_json::to_string(&reply) {
            Ok(json) => Some(Ok::<_, Infallible>(Event::default().event("reply").data(json))),
            Err(e) => {
                warn!(%chat_id, "failed to serialize reply event: {e}");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(%chat_id, skipped, "SSE consumer lagged, replies dropped");
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
