//! Webhook reply transport.
//!
//! POSTs each outbound reply as JSON to a configured URL. Used when the
//! salesperson-side chat frontend runs in another process and polls or
//! receives pushes instead of holding an SSE connection.

use prospect_core::transport::Transport;
use prospect_types::chat::{ChatId, MessageId, OutboundReply};
use prospect_types::error::TransportError;

/// Transport delivering replies by HTTP POST.
///
/// The request body is the [`OutboundReply`] serialized as JSON. Any
/// non-success status counts as a delivery failure.
#[derive(Clone, Debug)]
pub struct WebhookTransport {
    client: reqwest::Client,
    url: String,
}

impl WebhookTransport {
    /// Create a transport posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Transport for WebhookTransport {
    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<(), TransportError> {
        let reply = OutboundReply {
            chat_id,
            text: text.to_string(),
            reply_to,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&reply)
            .send()
            .await
            .map_err(|e| TransportError::Delivery(e.to_string()))?;

        response
            .error_for_status()
            .map(|_| ())
            .map_err(|e| TransportError::Delivery(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unparseable_url_is_delivery_error() {
        let transport = WebhookTransport::new("not a url");
        let err = transport.send(ChatId(7), "hello", None).await.unwrap_err();
        assert!(matches!(err, TransportError::Delivery(_)));
    }
}
