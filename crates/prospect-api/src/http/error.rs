//! Application error type mapping to HTTP status codes and envelope format.

use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use prospect_types::chat::ChatId;
use prospect_types::error::StoreError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Transcript store errors.
    Store(StoreError),
    /// No live session for the chat.
    SessionNotFound(ChatId),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl AppError {
    /// Machine-readable code and human-readable message for the envelope.
    /// The code also drives the HTTP status (see `response.rs`).
    fn code_and_message(&self) -> (&'static str, String) {
        match self {
            AppError::Store(StoreError::NotFound) => ("NOT_FOUND", "record not found".to_string()),
            AppError::Store(e) => ("STORE_ERROR", e.to_string()),
            AppError::SessionNotFound(chat_id) => (
                "SESSION_NOT_FOUND",
                format!("no live session for chat {chat_id}"),
            ),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = self.code_and_message();
        let request_id = Uuid::now_v7().to_string();
        ApiResponse::error(code, &message, request_id).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn session_not_found_is_404() {
        let resp = AppError::SessionNotFound(ChatId::new(42)).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_is_400() {
        let resp = AppError::Validation("invalid chat id: x".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failure_is_500() {
        let resp = AppError::Store(StoreError::Query("disk gone".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages_name_the_chat() {
        let (code, message) = AppError::SessionNotFound(ChatId::new(7)).code_and_message();
        assert_eq!(code, "SESSION_NOT_FOUND");
        assert!(message.contains('7'));
    }
}
