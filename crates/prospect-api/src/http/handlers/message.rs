//! Salesperson message ingress handler.
//!
//! POST /api/v1/chats/{chat_id}/messages
//!
//! Accepts one salesperson message, buffers it, and restarts the chat's
//! quiet-period timer. The generated reply arrives later on the chat's SSE
//! stream (or the configured webhook), correlated by the returned
//! `message_id`.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for the message ingress endpoint.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    /// The salesperson's message text.
    pub text: String,
}

/// POST /api/v1/chats/{chat_id}/messages - Buffer one salesperson message.
pub async fn post_message(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(body): Json<IncomingMessage>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let chat_id = super::parse_chat_id(&chat_id)?;

    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }

    let message_id = state.engine.handle_incoming(chat_id, text).await;

    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::json!({
        "chat_id": chat_id,
        "message_id": message_id.to_string(),
    });
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/chats/{chat_id}/messages"))
        .with_link("events", &format!("/api/v1/chats/{chat_id}/events"))
        .with_link("session", &format!("/api/v1/chats/{chat_id}/session"));

    Ok(Json(resp))
}
