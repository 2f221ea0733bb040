//! Runtime services and pipeline wiring for the home-bot.

use tokio::sync::mpsc;
use tracing::{error, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::{
        classifier::{Classifier, Exit},
        command::CommandRegistry,
        executor::Executor,
        reply::ReplySender,
    },
    service::{
        chat::{ChatClient, EventReceiver},
        list::ListClient,
    },
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the chat client, list client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat transport.
    pub chat: ChatClient,
    /// The shopping list service client.
    pub list: ListClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        // Initialize the chat transport.
        let chat = ChatClient::slack(&config)?;

        // Initialize the list service client.
        let list = ListClient::http(&config)?;

        Ok(Self { config, chat, list })
    }

    /// Connect to the chat service and run the pipeline until it stops.
    ///
    /// Returns an error when the pipeline stopped for a reason the operator has to fix.
    pub async fn start(&self) -> Void {
        let events = self.chat.listen().await?;

        match self.run(events).await {
            Exit::AuthInvalid => Err(anyhow::anyhow!("The chat service rejected the bot credentials.")),
            Exit::NeverConnected => Err(anyhow::anyhow!("The chat service closed the event stream before the bot connected.")),
            Exit::PipelineClosed => Err(anyhow::anyhow!("The command pipeline stopped unexpectedly.")),
            Exit::StreamClosed | Exit::Interrupted => Ok(()),
        }
    }

    /// Wires the three stages around `events` and waits for all of them to stop.
    #[instrument(skip_all)]
    pub async fn run(&self, events: EventReceiver) -> Exit {
        let (command_tx, command_rx) = mpsc::channel(1);
        let (reply_tx, reply_rx) = mpsc::channel(1);

        // Start the downstream stages first so the first dispatch has a consumer.

        let executor = Executor::new(CommandRegistry::builtin(&self.config), self.list.clone(), self.config.display_title.clone());
        let executor = tokio::spawn(executor.run(command_rx, reply_tx));

        let sender = ReplySender::new(self.chat.clone());
        let sender = tokio::spawn(sender.run(reply_rx));

        // Run ingestion on this task; when it returns the command channel closes.

        let classifier = Classifier::new(self.chat.clone(), command_tx);

        let exit = tokio::select! {
            exit = classifier.run(events) => exit,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C; shutting down ...");
                Exit::Interrupted
            }
        };

        // Let in-flight commands finish and their replies go out.

        if let Err(e) = executor.await {
            error!("Command executor task failed: {}", e);
        }

        if let Err(e) = sender.await {
            error!("Reply sender task failed: {}", e);
        }

        info!("Pipeline stopped: {:?}", exit);

        exit
    }
}
