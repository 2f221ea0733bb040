//! Chat service integration for home-bot.
//!
//! This module provides the transport the pipeline reads from and posts to:
//! - Receiving a stream of typed inbound events
//! - Resolving conversation metadata
//! - Posting replies
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! chat services, with a default implementation for Slack.

pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::base::types::{Conversation, InboundEvent, ReplyPayload, Res, Void};

// Types.

/// Receiving half of the transport's event stream.
pub type EventReceiver = mpsc::Receiver<InboundEvent>;

// Traits.

/// Generic "chat" trait that clients must implement.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Connect to the chat service and start producing events.
    ///
    /// The returned stream yields `Connected` once the connection is up and
    /// ends when the transport shuts down.
    async fn listen(&self) -> Res<EventReceiver>;

    /// Resolve a conversation id into its metadata.
    async fn conversation_info(&self, conversation_id: &str) -> Res<Conversation>;

    /// Post a reply to a conversation.
    ///
    /// The `display_title` is the message text; the payload is rendered by the
    /// implementation in whatever shape the chat service supports.
    async fn post_message(&self, conversation: &Conversation, display_title: &str, payload: &ReplyPayload) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
