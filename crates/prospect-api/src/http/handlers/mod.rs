//! HTTP request handlers for the REST API.

pub mod events;
pub mod message;
pub mod report;
pub mod session;

use prospect_types::chat::ChatId;

use crate::http::error::AppError;

/// Parse a numeric chat id path parameter, rejecting anything else with an
/// enveloped 400.
pub(crate) fn parse_chat_id(raw: &str) -> Result<ChatId, AppError> {
    raw.parse::<i64>()
        .map(ChatId::new)
        .map_err(|_| AppError::Validation(format!("invalid chat id: {raw}")))
}
