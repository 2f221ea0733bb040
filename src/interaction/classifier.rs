//! The event classifier: the ingestion loop at the head of the pipeline.
//!
//! It reads transport events one by one, keeps track of the bot's own identity,
//! and forwards messages that address the bot to the executor. Forwarding waits
//! for the executor to take the command, so a busy executor holds back ingestion.

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    base::types::{DispatchEnvelope, InboundEvent, MessageEvent},
    service::chat::{ChatClient, EventReceiver},
};

// Types.

/// Why the ingestion loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The transport rejected our credentials.
    AuthInvalid,
    /// The transport closed its event stream after connecting.
    StreamClosed,
    /// The transport closed its event stream without ever connecting.
    NeverConnected,
    /// The executor is gone, so nothing can be dispatched.
    PipelineClosed,
    /// The process was asked to stop.
    Interrupted,
}

/// What the loop should do after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop(Exit),
}

// Structs.

/// Ingestion loop state.
pub struct Classifier {
    /// The bot's own user id, known once the transport reports `Connected`.
    identity: Option<String>,
    chat: ChatClient,
    commands: mpsc::Sender<DispatchEnvelope>,
}

impl Classifier {
    pub fn new(chat: ChatClient, commands: mpsc::Sender<DispatchEnvelope>) -> Self {
        Self { identity: None, chat, commands }
    }

    /// Seeds the identity ahead of the first `Connected` event.
    #[cfg(test)]
    pub fn with_identity(mut self, bot_user_id: impl Into<String>) -> Self {
        self.identity = Some(bot_user_id.into());
        self
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Consumes events until a terminal event arrives or the stream ends.
    ///
    /// Dropping `self` on return closes the command channel, which lets the
    /// downstream stages drain and stop.
    #[instrument(name = "Classifier::run", skip_all)]
    pub async fn run(mut self, mut events: EventReceiver) -> Exit {
        while let Some(event) = events.recv().await {
            if let Flow::Stop(exit) = self.handle(event).await {
                info!("Ingestion loop stopping: {:?}", exit);
                return exit;
            }
        }

        if self.identity.is_none() {
            error!("Transport event stream closed before the bot connected.");
            return Exit::NeverConnected;
        }

        info!("Transport event stream closed.");
        Exit::StreamClosed
    }

    /// Handles a single event.
    pub async fn handle(&mut self, event: InboundEvent) -> Flow {
        match event {
            InboundEvent::Connected { bot_user_id } => self.on_connected(bot_user_id),
            InboundEvent::TeamJoin { user_id } => on_team_join(&user_id),
            InboundEvent::Message(message) => self.on_message(message).await,
            InboundEvent::ReactionRemoved { reaction } => on_reaction_removed(&reaction),
            InboundEvent::TransportError { message } => on_transport_error(&message),
            InboundEvent::AuthInvalid => on_auth_invalid(),
            InboundEvent::Other => Flow::Continue,
        }
    }

    fn on_connected(&mut self, bot_user_id: String) -> Flow {
        info!("Connected as {}", bot_user_id);
        self.identity = Some(bot_user_id);
        Flow::Continue
    }

    #[instrument(name = "Classifier::on_message", skip_all, fields(conversation = %message.conversation_id))]
    async fn on_message(&self, message: MessageEvent) -> Flow {
        let Some(bot_user_id) = self.identity.as_deref() else {
            debug!("Ignoring message received before the connection completed.");
            return Flow::Continue;
        };

        if message.sender_id == bot_user_id || !is_addressed(&message.text, bot_user_id) {
            return Flow::Continue;
        }

        // A failed lookup only costs this message.
        let conversation = match self.chat.conversation_info(&message.conversation_id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                error!("Failed to resolve conversation {}: {}", message.conversation_id, e);
                return Flow::Continue;
            }
        };

        let envelope = DispatchEnvelope {
            conversation,
            sender_id: message.sender_id.clone(),
            event: message,
        };

        if self.commands.send(envelope).await.is_err() {
            error!("Command executor has shut down; cannot dispatch.");
            return Flow::Stop(Exit::PipelineClosed);
        }

        Flow::Continue
    }
}

// Event handlers.

fn on_team_join(user_id: &str) -> Flow {
    info!("Team join event for {}", user_id);
    Flow::Continue
}

fn on_reaction_removed(reaction: &str) -> Flow {
    debug!("Reaction removed: {}", reaction);
    Flow::Continue
}

fn on_transport_error(message: &str) -> Flow {
    warn!("Transport error: {}", message);
    Flow::Continue
}

fn on_auth_invalid() -> Flow {
    error!("Invalid credentials; shutting down.");
    Flow::Stop(Exit::AuthInvalid)
}

// Helpers.

/// The token a message starts with when it mentions the bot.
pub fn address_token(bot_user_id: &str) -> String {
    format!("<@{bot_user_id}>")
}

/// Whether `text` is addressed to the bot: the mention token, alone or followed by whitespace.
pub fn is_addressed(text: &str, bot_user_id: &str) -> bool {
    match text.strip_prefix(&address_token(bot_user_id)) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

// Tests.
