//! Slack implementation of the chat transport.
//!
//! Events arrive over Socket Mode and are forwarded, one at a time, into a
//! single-slot channel. The socket callback awaits that send, so a busy
//! pipeline holds back the transport instead of buffering without bound.

use crate::base::{
    config::Config,
    types::{Conversation, InboundEvent, MessageEvent, ReplyPayload, Res, Void},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use serde_json::{Value, json};
use slack_morphism::{errors::SlackClientError, prelude::*};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, EventReceiver, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

/// Slack API error codes that mean the credentials will never work.
const AUTH_ERROR_CODES: [&str; 4] = ["invalid_auth", "not_authed", "account_inactive", "token_revoked"];

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    events: mpsc::Sender<InboundEvent>,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    client: Arc<FullClient>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    fn new(config: &Config) -> Res<Self> {
        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        Ok(Self { app_token, bot_token, client })
    }

    /// Runs the socket mode listener until it stops, forwarding events into `events`.
    #[instrument(name = "SlackChatClient::run_listener", skip_all)]
    async fn run_listener(self, events: mpsc::Sender<InboundEvent>) {
        // Resolve our own identity first; the classifier needs it to spot mentions.

        let session = self.client.open_session(&self.bot_token);
        let bot_user_id = match session.auth_test().await {
            Ok(response) => response.user_id.0,
            Err(e) => {
                error!("Slack authentication failed: {}", e);
                if events.send(event_from_error(&e)).await.is_err() {
                    debug!("Pipeline already shut down; authentication failure not delivered.");
                }
                return;
            }
        };

        info!("Slack bot user ID: {}", bot_user_id);

        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState { events: events.clone() }));

        let socket_mode_listener = SlackClientSocketModeListener::new(&SlackClientSocketModeConfig::new(), listener_environment, socket_mode_callbacks);

        if let Err(e) = socket_mode_listener.listen_for(&self.app_token).await {
            error!("Failed to open the Slack socket: {}", e);
            if events.send(event_from_error(&e)).await.is_err() {
                debug!("Pipeline already shut down; socket failure not delivered.");
            }
            return;
        }

        if events.send(InboundEvent::Connected { bot_user_id }).await.is_err() {
            return;
        }

        // Serve until Ctrl-C; dropping `events` afterwards closes the stream.
        socket_mode_listener.serve().await;

        info!("Slack socket listener stopped.");
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    async fn listen(&self) -> Res<EventReceiver> {
        let (events, receiver) = mpsc::channel(1);

        tokio::spawn(self.clone().run_listener(events));

        Ok(receiver)
    }

    #[instrument(skip(self))]
    async fn conversation_info(&self, conversation_id: &str) -> Res<Conversation> {
        let request = SlackApiConversationsInfoRequest::new(SlackChannelId(conversation_id.to_string()));
        let session = self.client.open_session(&self.bot_token);

        let response = session
            .conversations_info(&request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get conversation info: {}", e))?;

        Ok(Conversation {
            id: conversation_id.to_string(),
            name: response.channel.name.unwrap_or_else(|| conversation_id.to_string()),
        })
    }

    #[instrument(skip(self, payload))]
    async fn post_message(&self, conversation: &Conversation, display_title: &str, payload: &ReplyPayload) -> Void {
        let attachment: SlackMessageAttachment = serde_json::from_value(attachment_json(payload))?;

        let message = SlackMessageContent::new().with_text(display_title.to_string()).with_attachments(vec![attachment]);

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(conversation.id.clone()), message).with_as_user(true);

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }
}

// Helpers.

/// Encodes a reply payload as a legacy Slack message attachment.
fn attachment_json(payload: &ReplyPayload) -> Value {
    let fields: Vec<Value> = payload
        .fields
        .iter()
        .map(|field| json!({ "title": field.title, "value": field.value, "short": field.short }))
        .collect();

    json!({
        "pretext": payload.pretext,
        "fallback": payload.pretext,
        "color": payload.kind.color(),
        "fields": fields,
    })
}

/// Whether a Slack API error code means the credentials are unusable.
fn is_auth_error_code(code: &str) -> bool {
    AUTH_ERROR_CODES.contains(&code)
}

/// Converts a Slack client error into the event the classifier should see.
fn event_from_error(error: &SlackClientError) -> InboundEvent {
    match error {
        SlackClientError::ApiError(ae) if is_auth_error_code(&ae.code) => InboundEvent::AuthInvalid,
        other => InboundEvent::TransportError { message: other.to_string() },
    }
}

/// Maps a Slack push event onto the events the classifier understands.
fn event_from_push(body: SlackEventCallbackBody) -> InboundEvent {
    match body {
        SlackEventCallbackBody::Message(message) => {
            // Bots (ourselves included) never issue commands; edits and deletes carry no fresh text.
            if message.sender.bot_id.is_some() || message.subtype.is_some() {
                return InboundEvent::Other;
            }

            let conversation_id = message.origin.channel.as_ref().map(|c| c.0.clone());
            let sender_id = message.sender.user.as_ref().map(|u| u.0.clone());
            let text = message.content.as_ref().and_then(|c| c.text.clone());

            match (conversation_id, sender_id, text) {
                (Some(conversation_id), Some(sender_id), Some(text)) => InboundEvent::Message(MessageEvent { conversation_id, sender_id, text }),
                _ => {
                    debug!("Skipping message event without channel, user, or text.");
                    InboundEvent::Other
                }
            }
        }
        SlackEventCallbackBody::MemberJoinedChannel(joined) => InboundEvent::TeamJoin { user_id: joined.user.0 },
        SlackEventCallbackBody::ReactionRemoved(removed) => InboundEvent::ReactionRemoved { reaction: removed.reaction.0 },
        _ => InboundEvent::Other,
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(
        SlackMessageContent::new().with_text("Slash commands are not supported; mention the bot instead.".into()),
    ))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Clone the sender out so the state lock is not held while we wait on the pipeline.
    let events = {
        let states = states.read().await;
        let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;
        user_state.events.clone()
    };

    let event = event_from_push(event_callback.event);

    if events.send(event).await.is_err() {
        warn!("Dropping push event because the pipeline has shut down.");
    }

    Ok(())
}

// Tests.
