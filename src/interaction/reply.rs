//! The reply sender stage.

use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::{
    base::types::{ReplyEnvelope, ReplyPayload},
    service::chat::ChatClient,
};

/// Single consumer that posts replies back to their conversations.
pub struct ReplySender {
    chat: ChatClient,
}

impl ReplySender {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    /// Runs until the reply channel closes.
    #[instrument(name = "ReplySender::run", skip_all)]
    pub async fn run(self, mut replies: mpsc::Receiver<ReplyEnvelope>) {
        while let Some(reply) = replies.recv().await {
            self.send(reply).await;
        }

        info!("Reply sender stopped.");
    }

    /// Posts one reply; delivery failures are logged and never retried.
    #[instrument(name = "ReplySender::send", skip_all, fields(conversation = %reply.conversation.id))]
    pub async fn send(&self, reply: ReplyEnvelope) {
        let payload = match reply.payload {
            Some(payload) => payload,
            None => {
                warn!("Reply has no content; posting the fallback.");
                ReplyPayload::fallback()
            }
        };

        if let Err(e) = self.chat.post_message(&reply.conversation, &reply.display_title, &payload).await {
            error!("Failed to post reply to {}: {}", reply.conversation.name, e);
        }
    }
}

// Tests.
