//! Outbound reply transports.
//!
//! The engine pushes generated replies through the `Transport` port defined
//! in `prospect-core`. Two implementations: an in-process broadcast channel
//! consumed by the SSE event stream, and a webhook POST for chat frontends
//! living in another process.

pub mod channel;
pub mod webhook;

use prospect_core::transport::Transport;
use prospect_types::chat::{ChatId, MessageId};
use prospect_types::config::{TransportConfig, TransportMode};
use prospect_types::error::TransportError;

pub use channel::ChannelTransport;
pub use webhook::WebhookTransport;

/// Transport selected at startup from [`TransportConfig`].
///
/// Webhook mode mirrors every reply to the in-process channel as well, so
/// SSE subscribers keep observing the conversation regardless of mode.
#[derive(Debug)]
pub enum AnyTransport {
    Channel(ChannelTransport),
    Webhook {
        webhook: WebhookTransport,
        channel: ChannelTransport,
    },
}

impl AnyTransport {
    /// Build the transport described by `config`, reusing `channel` for
    /// in-process subscribers.
    pub fn from_config(
        config: &TransportConfig,
        channel: ChannelTransport,
    ) -> Result<Self, TransportError> {
        match config.mode {
            TransportMode::Channel => Ok(AnyTransport::Channel(channel)),
            TransportMode::Webhook => {
                let url = config.webhook_url.clone().ok_or_else(|| {
                    TransportError::InvalidConfig(
                        "transport mode 'webhook' requires webhook_url".to_string(),
                    )
                })?;
                Ok(AnyTransport::Webhook {
                    webhook: WebhookTransport::new(url),
                    channel,
                })
            }
        }
    }
}

impl Transport for AnyTransport {
    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<(), TransportError> {
        match self {
            AnyTransport::Channel(channel) => channel.send(chat_id, text, reply_to).await,
            AnyTransport::Webhook { webhook, channel } => {
                // The mirror is best-effort; a chat without SSE subscribers
                // is normal in webhook mode.
                let _ = channel.send(chat_id, text, reply_to).await;
                webhook.send(chat_id, text, reply_to).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_default_selects_channel() {
        let transport =
            AnyTransport::from_config(&TransportConfig::default(), ChannelTransport::new())
                .unwrap();
        assert!(matches!(transport, AnyTransport::Channel(_)));
    }

    #[test]
    fn from_config_webhook_without_url_is_rejected() {
        let config = TransportConfig {
            mode: TransportMode::Webhook,
            webhook_url: None,
        };
        let err = AnyTransport::from_config(&config, ChannelTransport::new()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn webhook_mode_mirrors_to_channel() {
        let channel = ChannelTransport::new();
        let mut rx = channel.subscribe(ChatId(5));

        // A URL reqwest cannot even parse: the webhook leg fails, the
        // channel mirror must still deliver.
        let transport = AnyTransport::Webhook {
            webhook: WebhookTransport::new("not a url"),
            channel: channel.clone(),
        };

        let result = transport.send(ChatId(5), "mirrored", None).await;
        assert!(result.is_err());

        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.text, "mirrored");
        assert_eq!(reply.chat_id, ChatId(5));
    }
}
