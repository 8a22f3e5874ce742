//! In-process broadcast transport.
//!
//! Fans outbound replies out to per-chat broadcast channels. The HTTP layer
//! subscribes one receiver per SSE connection; a reply sent while nobody is
//! listening reports [`TransportError::NoReceiver`] and the engine logs it
//! and moves on.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use prospect_core::transport::Transport;
use prospect_types::chat::{ChatId, MessageId, OutboundReply};
use prospect_types::error::TransportError;

/// Buffer size for per-chat reply channels. A slow SSE consumer that falls
/// further behind than this starts missing replies.
const REPLY_BUFFER: usize = 256;

/// In-process transport backed by per-chat [`broadcast`] channels.
#[derive(Clone, Debug, Default)]
pub struct ChannelTransport {
    senders: Arc<DashMap<ChatId, broadcast::Sender<OutboundReply>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to replies for one chat.
    ///
    /// Creates the channel if it does not exist yet, so subscribing before
    /// the first reply is safe.
    pub fn subscribe(&self, chat_id: ChatId) -> broadcast::Receiver<OutboundReply> {
        let entry = self.senders.entry(chat_id).or_insert_with(|| {
            let (tx, _) = broadcast::channel(REPLY_BUFFER);
            tx
        });
        entry.subscribe()
    }
}

impl Transport for ChannelTransport {
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

        let sender = self
            .senders
            .entry(chat_id)
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(REPLY_BUFFER);
                tx
            })
            .clone();

        // broadcast::send fails only when every receiver has been dropped.
        sender
            .send(reply)
            .map(|_| ())
            .map_err(|_| TransportError::NoReceiver(chat_id.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_reply() {
        let transport = ChannelTransport::new();
        let mut rx = transport.subscribe(ChatId(1));

        let id = MessageId::new();
        transport.send(ChatId(1), "How much is it?", Some(id)).await.unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.chat_id, ChatId(1));
        assert_eq!(reply.text, "How much is it?");
        assert_eq!(reply.reply_to, Some(id));
    }

    #[tokio::test]
    async fn send_without_subscriber_reports_no_receiver() {
        let transport = ChannelTransport::new();
        let err = transport.send(ChatId(9), "anyone there?", None).await.unwrap_err();
        assert!(matches!(err, TransportError::NoReceiver(9)));
    }

    #[tokio::test]
    async fn all_subscribers_receive() {
        let transport = ChannelTransport::new();
        let mut rx1 = transport.subscribe(ChatId(2));
        let mut rx2 = transport.subscribe(ChatId(2));

        transport.send(ChatId(2), "broadcast", None).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().text, "broadcast");
        assert_eq!(rx2.recv().await.unwrap().text, "broadcast");
    }

    #[tokio::test]
    async fn chats_are_isolated() {
        let transport = ChannelTransport::new();
        let mut rx = transport.subscribe(ChatId(3));

        // Chat 4 has no subscriber; chat 3's receiver must stay empty.
        let err = transport.send(ChatId(4), "elsewhere", None).await.unwrap_err();
        assert!(matches!(err, TransportError::NoReceiver(4)));
        assert!(rx.try_recv().is_err());
    }
}
