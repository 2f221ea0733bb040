pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

// Inbound events.

/// A chat message that may carry a bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// The conversation (channel) the message was posted in.
    pub conversation_id: String,
    /// The user who sent the message.
    pub sender_id: String,
    /// The raw message text, including any leading `<@BOT>` mention.
    pub text: String,
}

/// Events produced by the chat transport.
///
/// Only `Message` carries a payload that matters to dispatch; the rest steer the
/// ingestion loop or are observed and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Connected { bot_user_id: String },
    TeamJoin { user_id: String },
    Message(MessageEvent),
    ReactionRemoved { reaction: String },
    TransportError { message: String },
    AuthInvalid,
    Other,
}

// Conversations.

/// Resolved metadata for a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    /// Display name; falls back to the id for unnamed conversations.
    pub name: String,
}

// Envelopes.

/// A command routed from the classifier to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEnvelope {
    pub conversation: Conversation,
    pub event: MessageEvent,
    pub sender_id: String,
}

/// A reply routed from the executor to the reply sender.
///
/// A `None` payload means "render the fallback", never "drop".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub conversation: Conversation,
    pub display_title: String,
    pub payload: Option<ReplyPayload>,
}

// Reply payloads.

/// The class of a reply, which decides its color tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Info,
    Success,
    Failure,
    Fallback,
}

impl ReplyKind {
    /// The attachment color for this kind of reply.
    pub fn color(&self) -> &'static str {
        match self {
            ReplyKind::Info => "#B733FF",
            ReplyKind::Success => "#0a84c1",
            ReplyKind::Failure => "#e01e5a",
            ReplyKind::Fallback => "#9e9e9e",
        }
    }
}

/// One `(title, detail, layout-hint)` row in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyField {
    pub title: String,
    pub value: String,
    /// Render side-by-side with neighbouring short fields.
    pub short: bool,
}

impl ReplyField {
    pub fn new(title: impl Into<String>, value: impl Into<String>, short: bool) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short,
        }
    }
}

/// Transport-agnostic reply content returned by a command handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPayload {
    pub pretext: String,
    pub kind: ReplyKind,
    pub fields: Vec<ReplyField>,
}

impl ReplyPayload {
    pub fn new(pretext: impl Into<String>, kind: ReplyKind) -> Self {
        Self {
            pretext: pretext.into(),
            kind,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: ReplyField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = ReplyField>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// The payload posted when no handler-produced content exists.
    pub fn fallback() -> Self {
        Self::new("Unable to retrieve list", ReplyKind::Fallback)
    }

    pub fn is_failure(&self) -> bool {
        self.kind == ReplyKind::Failure
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_colored_apart_from_success() {
        let fallback = ReplyPayload::fallback();

        assert_eq!(fallback.pretext, "Unable to retrieve list");
        assert_ne!(fallback.kind.color(), ReplyKind::Success.color());
        assert!(!fallback.is_failure());
    }

    #[test]
    fn builder_keeps_field_order() {
        let payload = ReplyPayload::new("List", ReplyKind::Info)
            .with_field(ReplyField::new("a", "1", true))
            .with_fields(vec![ReplyField::new("b", "2", false), ReplyField::new("c", "3", false)]);

        let titles: Vec<_> = payload.fields.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }
}
