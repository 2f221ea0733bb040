//! Bot commands and the registry the executor dispatches through.
//!
//! Every command both describes itself (for `help`) and executes, so the help
//! listing can never drift from what actually runs. A registry always carries a
//! default command, which answers anything it does not recognize.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    base::{
        config::Config,
        types::{ReplyField, ReplyKind, ReplyPayload, Res},
    },
    service::list::{Item, ListClient, ShoppingList},
};

// Context.

/// Everything a command can see while it runs.
pub struct CommandContext<'a> {
    /// The keyword the user typed, if any (`None` for a bare mention).
    pub keyword: Option<&'a str>,
    /// Tokens following the keyword.
    pub args: &'a [&'a str],
    /// The user who issued the command.
    pub sender_id: &'a str,
    pub list: &'a ListClient,
    pub registry: &'a CommandRegistry,
}

// Traits.

/// A bot command.
///
/// Returning `Err` means the command broke internally; the reply sender then
/// posts the generic fallback. Expected failures, like the list service being
/// down, should come back as a failure-class `ReplyPayload` instead.
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// The word that invokes the command, right after the mention.
    fn keyword(&self) -> &str;

    /// One-line help text.
    fn describe(&self) -> &str;

    /// Run the command and build its reply.
    async fn execute(&self, ctx: &CommandContext<'_>) -> Res<ReplyPayload>;
}

// Registry.

/// Ordered set of commands plus the default that catches everything else.
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
    default: Box<dyn Command>,
}

impl CommandRegistry {
    /// Creates an empty registry that answers everything with `default`.
    pub fn new(default: impl Command) -> Self {
        Self {
            commands: Vec::new(),
            default: Box::new(default),
        }
    }

    /// Registers a command; later registrations never shadow earlier ones.
    pub fn with_command(mut self, command: impl Command) -> Self {
        if self.commands.iter().any(|c| c.keyword().eq_ignore_ascii_case(command.keyword())) {
            warn!("Ignoring duplicate registration of command `{}`.", command.keyword());
            return self;
        }

        self.commands.push(Box::new(command));
        self
    }

    /// The registry with every built-in command.
    pub fn builtin(config: &Config) -> Self {
        Self::new(UnknownCommand)
            .with_command(HelpCommand)
            .with_command(WhoamiCommand {
                title: config.whoami_title.clone(),
                description: config.whoami_description.clone(),
            })
            .with_command(ListCommand)
            .with_command(AddCommand)
            .with_command(DoneCommand)
    }

    /// Finds the command for `keyword`, falling back to the default.
    pub fn resolve(&self, keyword: Option<&str>) -> &dyn Command {
        keyword
            .and_then(|keyword| self.commands.iter().find(|c| c.keyword().eq_ignore_ascii_case(keyword)))
            .map(|c| c.as_ref())
            .unwrap_or(self.default.as_ref())
    }

    /// Registered commands, in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }
}

// Built-in commands.

/// Lists every registered command.
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn keyword(&self) -> &str {
        "help"
    }

    fn describe(&self) -> &str {
        "See the available bot commands."
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Res<ReplyPayload> {
        let fields = ctx.registry.commands().map(|c| ReplyField::new(format!("<bot> {}", c.keyword()), c.describe(), false));

        Ok(ReplyPayload::new("Bot Command List", ReplyKind::Info).with_fields(fields))
    }
}

/// Introduces the bot.
pub struct WhoamiCommand {
    pub title: String,
    pub description: String,
}

#[async_trait]
impl Command for WhoamiCommand {
    fn keyword(&self) -> &str {
        "whoami"
    }

    fn describe(&self) -> &str {
        &self.description
    }

    async fn execute(&self, _ctx: &CommandContext<'_>) -> Res<ReplyPayload> {
        Ok(ReplyPayload::new("Who am i?", ReplyKind::Success).with_field(ReplyField::new(self.title.clone(), self.description.clone(), true)))
    }
}

/// Shows the current shopping list.
pub struct ListCommand;

#[async_trait]
impl Command for ListCommand {
    fn keyword(&self) -> &str {
        "list"
    }

    fn describe(&self) -> &str {
        "Show the current shopping list."
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Res<ReplyPayload> {
        match ctx.list.retrieve().await {
            Ok(list) => {
                info!("Retrieved shopping list for {}.", ctx.sender_id);
                Ok(render_list(&list))
            }
            Err(e) => {
                warn!("Failed to retrieve shopping list: {}", e);
                Ok(ReplyPayload::new("Unable to retrieve list", ReplyKind::Failure).with_field(ReplyField::new("Error", e.to_string(), false)))
            }
        }
    }
}

/// Appends an item to the current shopping list.
pub struct AddCommand;

#[async_trait]
impl Command for AddCommand {
    fn keyword(&self) -> &str {
        "add"
    }

    fn describe(&self) -> &str {
        "Add an item: `add [quantity] <name> [description]`."
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Res<ReplyPayload> {
        let Some(item) = parse_item(ctx.args) else {
            return Ok(not_updated("Unable to add item", "Tell me what to add, e.g. `add 2 milk full cream`."));
        };

        match ctx.list.append(&item).await {
            Ok(()) => {
                info!("{} added {} to the shopping list.", ctx.sender_id, item.name);
                Ok(ReplyPayload::new("Shopping List Updated!", ReplyKind::Success).with_field(ReplyField::new("Item added", describe_item(&item), true)))
            }
            Err(e) => {
                warn!("Failed to append to shopping list: {}", e);
                Ok(not_updated("Item not added", &e.to_string()))
            }
        }
    }
}

/// Completes the current shopping list.
pub struct DoneCommand;

#[async_trait]
impl Command for DoneCommand {
    fn keyword(&self) -> &str {
        "done"
    }

    fn describe(&self) -> &str {
        "Mark the current shopping list as complete."
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Res<ReplyPayload> {
        match ctx.list.complete().await {
            Ok(()) => {
                info!("{} completed the shopping list.", ctx.sender_id);
                Ok(ReplyPayload::new("Shopping List Updated!", ReplyKind::Success).with_field(ReplyField::new("List completed", "", true)))
            }
            Err(e) => {
                warn!("Failed to complete shopping list: {}", e);
                Ok(not_updated("Unable to complete the list", &e.to_string()))
            }
        }
    }
}

/// Answers anything the registry does not recognize.
pub struct UnknownCommand;

#[async_trait]
impl Command for UnknownCommand {
    fn keyword(&self) -> &str {
        ""
    }

    fn describe(&self) -> &str {
        "Replies to unrecognized commands."
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Res<ReplyPayload> {
        let title = match ctx.keyword {
            Some(keyword) => format!("I don't know how to `{keyword}`."),
            None => "You mentioned me without a command.".to_string(),
        };

        Ok(ReplyPayload::new("Unknown command", ReplyKind::Info).with_field(ReplyField::new(title, "Try `<bot> help` to see the available commands.", false)))
    }
}

// Helpers.

/// Parses `[quantity] <name> [description...]` into an item.
pub fn parse_item(args: &[&str]) -> Option<Item> {
    let (quantity, rest) = match args.split_first() {
        Some((first, rest)) => match first.parse::<u32>() {
            Ok(quantity) => (quantity, rest),
            Err(_) => (1, args),
        },
        None => return None,
    };

    let (name, description) = rest.split_first()?;

    if quantity == 0 {
        return None;
    }

    Some(Item {
        name: name.to_string(),
        quantity,
        description: description.join(" "),
    })
}

fn describe_item(item: &Item) -> String {
    format!("{} x {} {}", item.quantity, item.name, item.description).trim_end().to_string()
}

fn render_list(list: &ShoppingList) -> ReplyPayload {
    let pretext = match &list.updated_at {
        Some(updated_at) => format!("Shopping List (updated {})", updated_at.format("%Y-%m-%d %H:%M UTC")),
        None => "Shopping List".to_string(),
    };

    if list.items.is_empty() {
        return ReplyPayload::new(pretext, ReplyKind::Success).with_field(ReplyField::new("The list is empty", "", false));
    }

    let fields = list.items.iter().map(|item| ReplyField::new(item.name.clone(), describe_item(item), false));

    ReplyPayload::new(pretext, ReplyKind::Success).with_fields(fields)
}

fn not_updated(title: &str, detail: &str) -> ReplyPayload {
    ReplyPayload::new("Shopping List Not updated!", ReplyKind::Failure).with_field(ReplyField::new(title, detail, true))
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use mockall::mock;

    use super::*;
    use crate::{
        base::{
            config::ConfigInner,
            types::{Res, Void},
        },
        service::list::GenericListClient,
    };

    mock! {
        pub List {}

        #[async_trait]
        impl GenericListClient for List {
            async fn append(&self, item: &Item) -> Void;
            async fn complete(&self) -> Void;
            async fn retrieve(&self) -> Res<ShoppingList>;
        }
    }

    fn config() -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                whoami_title: "I, Tömat Vörben".to_string(),
                whoami_description: "The smell of a vampire, the touch of butterfly...".to_string(),
                ..Default::default()
            }),
        }
    }

    async fn run(registry: &CommandRegistry, list: MockList, text: &str) -> Res<ReplyPayload> {
        let list = ListClient::new(Arc::new(list));
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let keyword = tokens.first().copied();
        let args = tokens.get(1..).unwrap_or_default();

        let ctx = CommandContext {
            keyword,
            args,
            sender_id: "U54321",
            list: &list,
            registry,
        };

        registry.resolve(keyword).execute(&ctx).await
    }

    #[tokio::test]
    async fn help_lists_every_command() {
        let registry = CommandRegistry::builtin(&config());

        let payload = run(&registry, MockList::new(), "help").await.unwrap();

        let titles: Vec<_> = payload.fields.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(payload.pretext, "Bot Command List");
        assert_eq!(titles, vec!["<bot> help", "<bot> whoami", "<bot> list", "<bot> add", "<bot> done"]);
    }

    #[tokio::test]
    async fn whoami_has_fixed_identity_field() {
        let registry = CommandRegistry::builtin(&config());

        let payload = run(&registry, MockList::new(), "whoami").await.unwrap();

        assert_eq!(payload.pretext, "Who am i?");
        assert_eq!(payload.fields.len(), 1);
        assert_eq!(payload.fields[0].title, "I, Tömat Vörben");
        assert!(payload.fields[0].short);
    }

    #[tokio::test]
    async fn unknown_keyword_gets_default_reply() {
        let registry = CommandRegistry::builtin(&config());

        let payload = run(&registry, MockList::new(), "dance").await.unwrap();

        assert_eq!(payload.pretext, "Unknown command");
        assert!(payload.fields[0].title.contains("dance"));
    }

    #[tokio::test]
    async fn missing_keyword_gets_default_reply() {
        let registry = CommandRegistry::builtin(&config());

        let payload = run(&registry, MockList::new(), "").await.unwrap();

        assert_eq!(payload.pretext, "Unknown command");
    }

    #[tokio::test]
    async fn keywords_match_case_insensitively() {
        let registry = CommandRegistry::builtin(&config());

        assert_eq!(registry.resolve(Some("HELP")).keyword(), "help");
    }

    #[tokio::test]
    async fn duplicate_registration_is_ignored() {
        let registry = CommandRegistry::new(UnknownCommand).with_command(HelpCommand).with_command(HelpCommand);

        assert_eq!(registry.commands().count(), 1);
    }

    #[tokio::test]
    async fn add_appends_parsed_item() {
        let registry = CommandRegistry::builtin(&config());
        let mut list = MockList::new();
        list.expect_append()
            .withf(|item| item.name == "milk" && item.quantity == 2 && item.description == "full cream")
            .times(1)
            .returning(|_| Ok(()));

        let payload = run(&registry, list, "add 2 milk full cream").await.unwrap();

        assert_eq!(payload.pretext, "Shopping List Updated!");
        assert_eq!(payload.fields[0].value, "2 x milk full cream");
    }

    #[tokio::test]
    async fn add_failure_is_not_updated() {
        let registry = CommandRegistry::builtin(&config());
        let mut list = MockList::new();
        list.expect_append().times(1).returning(|_| Err(anyhow::anyhow!("List service responded with status 500")));

        let payload = run(&registry, list, "add eggs").await.unwrap();

        assert!(payload.is_failure());
        assert_eq!(payload.pretext, "Shopping List Not updated!");
        assert!(payload.fields[0].value.contains("500"));
    }

    #[tokio::test]
    async fn add_without_item_does_not_call_service() {
        let registry = CommandRegistry::builtin(&config());
        let mut list = MockList::new();
        list.expect_append().never();

        let payload = run(&registry, list, "add").await.unwrap();

        assert!(payload.is_failure());
    }

    #[tokio::test]
    async fn done_failure_is_not_updated() {
        let registry = CommandRegistry::builtin(&config());
        let mut list = MockList::new();
        list.expect_complete().times(1).returning(|| Err(anyhow::anyhow!("List service responded with status 503")));

        let payload = run(&registry, list, "done").await.unwrap();

        assert!(payload.is_failure());
        assert_eq!(payload.pretext, "Shopping List Not updated!");
    }

    #[tokio::test]
    async fn list_renders_items() {
        let registry = CommandRegistry::builtin(&config());
        let mut list = MockList::new();
        list.expect_retrieve().times(1).returning(|| {
            Ok(ShoppingList {
                items: vec![Item {
                    name: "bread".to_string(),
                    quantity: 1,
                    description: String::new(),
                }],
                updated_at: Some(Utc.with_ymd_and_hms(2026, 10, 1, 8, 30, 0).unwrap()),
            })
        });

        let payload = run(&registry, list, "list").await.unwrap();

        assert_eq!(payload.pretext, "Shopping List (updated 2026-10-01 08:30 UTC)");
        assert_eq!(payload.fields[0].title, "bread");
        assert_eq!(payload.fields[0].value, "1 x bread");
        assert!(!payload.fields[0].short);
    }

    #[tokio::test]
    async fn list_failure_is_failure_class() {
        let registry = CommandRegistry::builtin(&config());
        let mut list = MockList::new();
        list.expect_retrieve().times(1).returning(|| Err(anyhow::anyhow!("connection refused")));

        let payload = run(&registry, list, "list").await.unwrap();

        assert!(payload.is_failure());
        assert_eq!(payload.pretext, "Unable to retrieve list");
    }

    #[test]
    fn parse_item_defaults_quantity() {
        let item = parse_item(&["eggs"]).unwrap();

        assert_eq!(item.quantity, 1);
        assert_eq!(item.name, "eggs");
        assert_eq!(item.description, "");
    }

    #[test]
    fn parse_item_rejects_degenerate_input() {
        assert!(parse_item(&[]).is_none());
        assert!(parse_item(&["3"]).is_none());
        assert!(parse_item(&["0", "eggs"]).is_none());
    }
}
