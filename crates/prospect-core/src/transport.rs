//! Transport trait definition.

use prospect_types::chat::{ChatId, MessageId};
use prospect_types::error::TransportError;

/// Port for delivering generated replies to the trainee's chat surface.
///
/// Implementations live in prospect-infra (`ChannelTransport`,
/// `WebhookTransport`). Uses native async fn in traits (RPITIT, Rust 2024
/// edition).
pub trait Transport: Send + Sync {
    /// Deliver one customer reply.
    ///
    /// `reply_to` names the inbound message this reply answers so the
    /// surface can thread it; session greetings pass `None`. Delivery
    /// failures are the caller's to log -- a failed send never rolls back
    /// history or persistence.
    fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
