//! The command executor stage.
//!
//! Receives one dispatched command at a time, runs it to completion, and hands
//! exactly one reply to the reply sender before looking at the next command.

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    base::types::{DispatchEnvelope, ReplyEnvelope},
    service::list::ListClient,
};

use super::command::{CommandContext, CommandRegistry};

/// Single consumer that turns commands into replies.
pub struct Executor {
    registry: CommandRegistry,
    list: ListClient,
    display_title: String,
}

impl Executor {
    pub fn new(registry: CommandRegistry, list: ListClient, display_title: impl Into<String>) -> Self {
        Self {
            registry,
            list,
            display_title: display_title.into(),
        }
    }

    /// Runs until the command channel closes or the reply sender goes away.
    #[instrument(name = "Executor::run", skip_all)]
    pub async fn run(self, mut commands: mpsc::Receiver<DispatchEnvelope>, replies: mpsc::Sender<ReplyEnvelope>) {
        while let Some(envelope) = commands.recv().await {
            let reply = self.execute(envelope).await;

            if replies.send(reply).await.is_err() {
                warn!("Reply sender has shut down; stopping the executor.");
                break;
            }
        }

        info!("Command executor stopped.");
    }

    /// Executes one command and builds its reply.
    ///
    /// Never fails: a broken command yields a reply without payload, which the
    /// reply sender renders as the fallback.
    #[instrument(name = "Executor::execute", skip_all, fields(conversation = %envelope.conversation.id))]
    pub async fn execute(&self, envelope: DispatchEnvelope) -> ReplyEnvelope {
        let tokens: Vec<&str> = envelope.event.text.split_whitespace().collect();
        let keyword = tokens.get(1).copied();
        let args = tokens.get(2..).unwrap_or_default();

        debug!("Received command {:?}", tokens);

        let command = self.registry.resolve(keyword);
        let ctx = CommandContext {
            keyword,
            args,
            sender_id: &envelope.sender_id,
            list: &self.list,
            registry: &self.registry,
        };

        let payload = match command.execute(&ctx).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!("Command `{}` failed: {}", keyword.unwrap_or_default(), e);
                None
            }
        };

        ReplyEnvelope {
            conversation: envelope.conversation,
            display_title: self.display_title.clone(),
            payload,
        }
    }
}

// Tests.
