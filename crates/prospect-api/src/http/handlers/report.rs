//! Transcript reporting endpoints.
//!
//! Endpoints:
//! - GET /api/v1/runs/{run_id}/messages - Persisted transcript for one run
//! - GET /api/v1/stats                  - Engine and transcript counters

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use prospect_core::store::TranscriptStore;
use prospect_types::chat::MessageRecord;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/runs/{run_id}/messages - Transcript for one run.
///
/// Messages come back in timestamp order, salesperson and customer sides
/// interleaved. An unknown run id yields an empty list, not a 404; runs
/// only exist through their messages.
pub async fn run_messages(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MessageRecord>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let run_id = run_id
        .parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("invalid run id: {run_id}")))?;

    let messages = state.engine.store().list_by_run(&run_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(messages, request_id, elapsed)
        .with_link("self", &format!("/api/v1/runs/{run_id}/messages"))
        .with_link("stats", "/api/v1/stats");

    Ok(Json(resp))
}

/// GET /api/v1/stats - Engine and transcript counters.
///
/// Transcript counts come from the store; session and buffer counts are
/// live process state.
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let store = state.engine.store();
    let total_messages = store.count_all().await?;
    let total_runs = store.count_runs().await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::json!({
        "total_messages": total_messages,
        "total_runs": total_runs,
        "active_sessions": state.engine.active_sessions(),
        "pending_chats": state.engine.pending_chats(),
    });
    let resp = ApiResponse::success(data, request_id, elapsed).with_link("self", "/api/v1/stats");

    Ok(Json(resp))
}
