//! Session lifecycle HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/chats/{chat_id}/start   - Ensure a session and greet
//! - POST /api/v1/chats/{chat_id}/reset   - Drop the session and its buffer
//! - GET  /api/v1/chats/{chat_id}/session - Live session info

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use prospect_types::chat::{SessionInfo, SessionStart};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/chats/{chat_id}/start - Ensure a session and greet.
///
/// Reuses an existing session untouched, creating one (fresh topic and run
/// id) only when the chat has none, then sends an opening customer greeting
/// through the transport. Wiping state is `reset`'s job. The greeting is
/// also returned in the body for callers without an SSE subscription.
pub async fn start_session(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<SessionStart>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let chat_id = super::parse_chat_id(&chat_id)?;
    let started = state.engine.start_session(chat_id).await;

    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(started, request_id, elapsed)
        .with_link("self", &format!("/api/v1/chats/{chat_id}/start"))
        .with_link("session", &format!("/api/v1/chats/{chat_id}/session"))
        .with_link("events", &format!("/api/v1/chats/{chat_id}/events"));

    Ok(Json(resp))
}

/// POST /api/v1/chats/{chat_id}/reset - Drop the session.
///
/// Buffered messages and the armed timer go with it. `reset` reports
/// whether a session existed.
pub async fn reset_session(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let chat_id = super::parse_chat_id(&chat_id)?;
    let existed = state.engine.reset(chat_id);

    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::json!({
        "chat_id": chat_id,
        "reset": existed,
    });
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/chats/{chat_id}/reset"))
        .with_link("start", &format!("/api/v1/chats/{chat_id}/start"));

    Ok(Json(resp))
}

/// GET /api/v1/chats/{chat_id}/session - Live session info.
///
/// 404 when the chat has no session; `start` or the first inbound message
/// creates one.
pub async fn get_session(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let chat_id = super::parse_chat_id(&chat_id)?;
    let info = state
        .engine
        .session_info(chat_id)
        .ok_or(AppError::SessionNotFound(chat_id))?;

    let elapsed = start.elapsed().as_millis() as u64;

    let run_id = info.run_id;
    let resp = ApiResponse::success(info, request_id, elapsed)
        .with_link("self", &format!("/api/v1/chats/{chat_id}/session"))
        .with_link("messages", &format!("/api/v1/runs/{run_id}/messages"))
        .with_link("events", &format!("/api/v1/chats/{chat_id}/events"));

    Ok(Json(resp))
}
