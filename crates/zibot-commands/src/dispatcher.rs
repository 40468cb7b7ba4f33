//! Turns inbound text messages into command invocations.
//!
//! A message goes through prefix stripping, tokenizing, registry lookup, the
//! command's admission predicate and its cooldown before the handler runs.
//! Every failure along the way is reported back to the channel; nothing a
//! handler does, including panicking, escapes [`Dispatcher::handle`].

use arc_swap::ArcSwap;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};
use zibot_common::{round_secs, MessageRef, Origin, UserId};
use zibot_config::Config;

use crate::context::{AdmissionContext, Invocation, Reply};
use crate::cooldown::{Admission, RateLimiter};
use crate::paging::SessionSupervisor;
use crate::registry::{CommandId, CommandRegistry, RegistryError};
use crate::transport::Transport;

/// Ordered set of command prefixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixSet {
    prefixes: Vec<String>,
}

impl PrefixSet {
    /// Builds a prefix set; empty prefixes are dropped, duplicates collapsed
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        set.extend(prefixes.into_iter().map(Into::into));
        set
    }

    /// Adds the two mention forms of `bot` as prefixes
    #[must_use]
    pub fn with_mention(mut self, bot: UserId) -> Self {
        self.extend([format!("<@{bot}>"), format!("<@!{bot}>")]);
        self
    }

    fn extend(&mut self, prefixes: impl IntoIterator<Item = String>) {
        for prefix in prefixes {
            if !prefix.is_empty() && !self.prefixes.contains(&prefix) {
                self.prefixes.push(prefix);
            }
        }
        // Longest first, so `$>` wins over `$`.
        self.prefixes.sort_by(|a, b| b.len().cmp(&a.len()));
    }

    /// Strips exactly one prefix, the longest that matches
    pub fn strip<'a>(&self, content: &'a str) -> Option<&'a str> {
        let content = content.trim_start();
        self.prefixes
            .iter()
            .find_map(|prefix| content.strip_prefix(prefix.as_str()))
    }

    /// The prefixes, longest first
    pub fn as_slice(&self) -> &[String] {
        &self.prefixes
    }
}

/// An inbound text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    /// Raw message content
    pub content: String,
    /// Author of the message
    pub author: UserId,
    /// Where it was posted
    pub origin: Origin,
    /// When it was received
    pub timestamp: Instant,
}

/// Why an invocation did not run to completion.
///
/// `Display` is the notice shown to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No command matches the first token
    #[error("There's no command called `{0}`")]
    NotFound(String),

    /// The command's predicate rejected the invoker
    #[error("You're not allowed to use `{command}`")]
    Unauthorized {
        /// Qualified command name
        command: String,
    },

    /// The command is on cooldown
    #[error("slowdown bud! Try again in {wait_secs}s")]
    Throttled {
        /// Qualified command name
        command: String,
        /// Exact time until a slot frees up
        retry_after: Duration,
        /// `retry_after` rounded to the nearest whole second, at least 1
        wait_secs: u64,
    },

    /// The handler returned an error or panicked
    #[error("Something went wrong while running `{command}`")]
    HandlerFailure {
        /// Qualified command name
        command: String,
        /// Internal description, logged but not shown
        message: String,
    },
}

/// What [`Dispatcher::handle`] did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command
    Ignored,
    /// The command ran and its reply was delivered
    Replied,
    /// The command ran and opened a paging session on this message
    Paged(MessageRef),
    /// The invocation was refused or failed; the user has been told
    Rejected(DispatchError),
    /// The command ran but its reply could not be delivered
    Undelivered(String),
}

/// Routes text events to command handlers
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    limiter: Arc<RateLimiter>,
    supervisor: SessionSupervisor,
    transport: Arc<dyn Transport>,
    base_prefixes: PrefixSet,
    prefixes: ArcSwap<PrefixSet>,
    mention_prefix: bool,
    delete_throttle_notice: bool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.registry.len())
            .field("prefixes", &self.prefixes.load().as_slice())
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher over a fully built registry
    pub fn new(
        registry: Arc<CommandRegistry>,
        limiter: Arc<RateLimiter>,
        supervisor: SessionSupervisor,
        transport: Arc<dyn Transport>,
        config: &Config,
    ) -> Self {
        let base_prefixes = PrefixSet::new(config.discord.prefixes.iter().cloned());
        Self {
            registry,
            limiter,
            supervisor,
            transport,
            prefixes: ArcSwap::from_pointee(base_prefixes.clone()),
            base_prefixes,
            mention_prefix: config.discord.mention_prefix,
            delete_throttle_notice: config.rate_limiting.delete_throttle_notice,
        }
    }

    /// Registers the bot's own id once it is known, enabling mention prefixes
    pub fn set_bot_user(&self, bot: UserId) {
        if self.mention_prefix {
            self.prefixes
                .store(Arc::new(self.base_prefixes.clone().with_mention(bot)));
            debug!("Mention prefixes enabled for {}", bot);
        }
    }

    /// Currently active prefixes
    pub fn prefixes(&self) -> Arc<PrefixSet> {
        self.prefixes.load_full()
    }

    /// The registry commands are resolved from
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Handles one inbound text event
    #[instrument(skip(self, event), fields(author = %event.author, origin = %event.origin))]
    pub async fn handle(&self, event: TextEvent) -> DispatchOutcome {
        let tokens: Vec<String> = {
            let prefixes = self.prefixes.load();
            let Some(rest) = prefixes.strip(&event.content) else {
                return DispatchOutcome::Ignored;
            };
            rest.split_whitespace().map(str::to_string).collect()
        };
        if tokens.is_empty() {
            return DispatchOutcome::Ignored;
        }

        let resolution = match self.registry.resolve(&tokens) {
            Ok(resolution) => resolution,
            Err(RegistryError::NotFound(token)) => {
                debug!("Unknown command '{}'", token);
                return self.reject(&event, DispatchError::NotFound(token)).await;
            }
            Err(e) => {
                warn!("Unexpected registry error: {}", e);
                return DispatchOutcome::Ignored;
            }
        };
        let id = resolution.id;
        let args = resolution.remaining.to_vec();
        let (Some(descriptor), Some(command)) = (self.registry.get(id), self.registry.qualified_name(id)) else {
            return DispatchOutcome::Ignored;
        };
        let command = command.to_string();

        let admission = AdmissionContext {
            invoker: event.author,
            origin: event.origin,
        };
        if !descriptor.admits(&admission) {
            debug!("Command '{}' refused by its check", command);
            return self.reject(&event, DispatchError::Unauthorized { command }).await;
        }

        if let Some(policy) = descriptor.cooldown_policy() {
            if let Admission::Reject { retry_after } =
                self.limiter
                    .check(&command, policy, event.author, &event.origin, event.timestamp)
            {
                let wait_secs = round_secs(retry_after);
                debug!("Command '{}' throttled for {}s", command, wait_secs);
                return self
                    .reject_throttled(&event, command, retry_after, wait_secs)
                    .await;
            }
        }

        let Some(handler) = descriptor.handler().cloned() else {
            return self.deliver(&event, Reply::Text(self.group_listing(id))).await;
        };

        let invocation = Invocation {
            command: command.clone(),
            invoker: event.author,
            origin: event.origin,
            args,
            registry: self.registry.clone(),
        };

        let failure = match AssertUnwindSafe(handler.call(invocation)).catch_unwind().await {
            Ok(Ok(reply)) => return self.deliver(&event, reply).await,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        error!(
            command = %command,
            invoker = %event.author,
            origin = %event.origin,
            "Command failed: {}",
            failure
        );
        self.reject(
            &event,
            DispatchError::HandlerFailure {
                command,
                message: failure,
            },
        )
        .await
    }

    async fn deliver(&self, event: &TextEvent, reply: Reply) -> DispatchOutcome {
        let channel = event.origin.channel;
        let result = match reply {
            Reply::Silent => return DispatchOutcome::Replied,
            Reply::Text(content) => self
                .transport
                .send_text(channel, &content)
                .await
                .map(|_| DispatchOutcome::Replied)
                .map_err(|e| e.to_string()),
            Reply::Pages(pages) if pages.len() == 1 => self
                .transport
                .send_page(channel, &pages.render(0), &[])
                .await
                .map(|_| DispatchOutcome::Replied)
                .map_err(|e| e.to_string()),
            Reply::Pages(pages) => self
                .supervisor
                .open(channel, event.author, pages)
                .await
                .map(DispatchOutcome::Paged)
                .map_err(|e| e.to_string()),
        };

        result.unwrap_or_else(|e| {
            warn!("Failed to deliver reply: {}", e);
            DispatchOutcome::Undelivered(e)
        })
    }

    async fn reject(&self, event: &TextEvent, error: DispatchError) -> DispatchOutcome {
        if let Err(e) = self.transport.send_text(event.origin.channel, &error.to_string()).await {
            warn!("Failed to send notice: {}", e);
        }
        DispatchOutcome::Rejected(error)
    }

    async fn reject_throttled(
        &self,
        event: &TextEvent,
        command: String,
        retry_after: Duration,
        wait_secs: u64,
    ) -> DispatchOutcome {
        let error = DispatchError::Throttled {
            command,
            retry_after,
            wait_secs,
        };
        let notice = format!("<@{}> {}", event.author, error);
        match self.transport.send_text(event.origin.channel, &notice).await {
            Ok(message) if self.delete_throttle_notice => {
                let transport = self.transport.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                    if let Err(e) = transport.delete_message(message).await {
                        debug!("Could not delete throttle notice {}: {}", message, e);
                    }
                });
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to send throttle notice: {}", e),
        }
        DispatchOutcome::Rejected(error)
    }

    fn group_listing(&self, id: CommandId) -> String {
        let name = self.registry.qualified_name(id).unwrap_or_default();
        let children = self.registry.children(id);
        if children.is_empty() {
            return format!("`{name}` has no subcommands");
        }

        let mut listing = format!("Subcommands of `{name}`:");
        for child in children {
            if let Some(signature) = self.registry.signature(*child) {
                listing.push_str(&format!("\n`{signature}`"));
            }
        }
        listing
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CommandError, CommandResult};
    use crate::cooldown::CooldownPolicy;
    use crate::paging::{Page, PageSet};
    use crate::registry::CommandDescriptor;
    use crate::testing::{RecordingTransport, TransportCall};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use zibot_common::test_utils::discord_fixtures::{test_origin, test_user_id};

    struct Harness {
        dispatcher: Dispatcher,
        transport: Arc<RecordingTransport>,
        supervisor: SessionSupervisor,
    }

    fn harness(registry: CommandRegistry, config: &Config) -> Harness {
        let transport = Arc::new(RecordingTransport::new());
        let supervisor = SessionSupervisor::new(transport.clone(), config.paging.clone());
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(RateLimiter::new()),
            supervisor.clone(),
            transport.clone(),
            config,
        );
        Harness {
            dispatcher,
            transport,
            supervisor,
        }
    }

    fn event(content: &str) -> TextEvent {
        TextEvent {
            content: content.to_string(),
            author: test_user_id(),
            origin: test_origin(),
            timestamp: Instant::now(),
        }
    }

    async fn echo(invocation: Invocation) -> CommandResult {
        Ok(Reply::text(invocation.args.join(",")))
    }

    async fn two_pages(_: Invocation) -> CommandResult {
        let pages = PageSet::new(vec![Page::new("a"), Page::new("b")])?;
        Ok(Reply::Pages(pages))
    }

    #[test]
    fn test_prefix_longest_match_wins() {
        let prefixes = PrefixSet::new(["$", "$>", ">"]);
        assert_eq!(prefixes.strip("$>ping"), Some("ping"));
        assert_eq!(prefixes.strip("$ping"), Some("ping"));
        assert_eq!(prefixes.strip(">>ping"), Some(">ping"));
        assert_eq!(prefixes.strip("ping"), None);
    }

    #[test]
    fn test_mention_prefix() {
        let prefixes = PrefixSet::new([">"]).with_mention(UserId(42));
        assert_eq!(prefixes.strip("<@42> ping"), Some(" ping"));
        assert_eq!(prefixes.strip("<@!42>ping"), Some("ping"));
        assert_eq!(prefixes.strip("<@43> ping"), None);
    }

    #[test]
    fn test_empty_prefix_dropped() {
        let prefixes = PrefixSet::new(["", ">", ">"]);
        assert_eq!(prefixes.as_slice(), [">"]);
    }

    #[tokio::test]
    async fn test_ping_invokes_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = CommandRegistry::new();
        registry
            .register(
                CommandDescriptor::new("ping", move |_: Invocation| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, CommandError>(Reply::text("Pong!"))
                    }
                })
                .check(|_| true),
            )
            .unwrap();
        let h = harness(registry, &Config::default());

        assert_eq!(h.dispatcher.handle(event(">ping")).await, DispatchOutcome::Replied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.transport.texts(), ["Pong!"]);
    }

    #[tokio::test]
    async fn test_non_commands_ignored() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::new("echo", echo)).unwrap();
        let h = harness(registry, &Config::default());

        assert_eq!(h.dispatcher.handle(event("hello")).await, DispatchOutcome::Ignored);
        assert_eq!(h.dispatcher.handle(event(">   ")).await, DispatchOutcome::Ignored);
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_arguments_passed_through() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::new("echo", echo)).unwrap();
        let h = harness(registry, &Config::default());

        h.dispatcher.handle(event("$>ECHO a  b")).await;
        assert_eq!(h.transport.texts(), ["a,b"]);
    }

    #[tokio::test]
    async fn test_unknown_command_notice() {
        let h = harness(CommandRegistry::new(), &Config::default());

        let outcome = h.dispatcher.handle(event(">weather london")).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Rejected(DispatchError::NotFound("weather".to_string()))
        );
        assert_eq!(h.transport.texts(), ["There's no command called `weather`"]);
    }

    #[tokio::test]
    async fn test_unauthorized_notice() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDescriptor::new("echo", echo).check(|_| false))
            .unwrap();
        let h = harness(registry, &Config::default());

        let outcome = h.dispatcher.handle(event(">echo hi")).await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(DispatchError::Unauthorized { .. })
        ));
        assert_eq!(h.transport.texts(), ["You're not allowed to use `echo`"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_notice_and_deletion() {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                CommandDescriptor::new("roll", echo).cooldown(CooldownPolicy::global(1, Duration::from_secs(5))),
            )
            .unwrap();
        let h = harness(registry, &Config::default());

        assert_eq!(h.dispatcher.handle(event(">roll 1")).await, DispatchOutcome::Replied);

        let mut second = event(">roll 2");
        second.timestamp += Duration::from_millis(1_500);
        match h.dispatcher.handle(second).await {
            DispatchOutcome::Rejected(DispatchError::Throttled {
                command,
                retry_after,
                wait_secs,
            }) => {
                assert_eq!(command, "roll");
                assert_eq!(retry_after, Duration::from_millis(3_500));
                assert_eq!(wait_secs, 4);
            }
            other => panic!("expected throttle, got {other:?}"),
        }

        let texts = h.transport.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1], format!("<@{}> slowdown bud! Try again in 4s", test_user_id()));
        assert_eq!(h.transport.deletions(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.transport.deletions(), 1);
    }

    #[tokio::test]
    async fn test_throttle_wait_rounds_to_nearest_second() {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                CommandDescriptor::new("roll", echo).cooldown(CooldownPolicy::global(1, Duration::from_secs(5))),
            )
            .unwrap();
        let mut config = Config::default();
        config.rate_limiting.delete_throttle_notice = false;
        let h = harness(registry, &config);

        let first = event(">roll");
        let mut second = first.clone();
        second.timestamp += Duration::from_millis(600);
        h.dispatcher.handle(first).await;

        assert!(matches!(
            h.dispatcher.handle(second).await,
            DispatchOutcome::Rejected(DispatchError::Throttled { wait_secs: 4, .. })
        ));
        assert!(h.transport.texts()[1].ends_with("Try again in 4s"));
    }

    #[tokio::test]
    async fn test_throttle_notice_kept_when_configured() {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                CommandDescriptor::new("roll", echo).cooldown(CooldownPolicy::global(1, Duration::from_secs(5))),
            )
            .unwrap();
        let mut config = Config::default();
        config.rate_limiting.delete_throttle_notice = false;
        let h = harness(registry, &config);

        h.dispatcher.handle(event(">roll")).await;
        h.dispatcher.handle(event(">roll")).await;
        tokio::task::yield_now().await;
        assert_eq!(h.transport.deletions(), 0);
        assert_eq!(h.transport.texts().len(), 2);
    }

    #[tokio::test]
    async fn test_handler_error_caught() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDescriptor::new("fail", |_: Invocation| async {
                Err::<Reply, CommandError>("database unreachable".into())
            }))
            .unwrap();
        let h = harness(registry, &Config::default());

        let outcome = h.dispatcher.handle(event(">fail")).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Rejected(DispatchError::HandlerFailure {
                command: "fail".to_string(),
                message: "database unreachable".to_string(),
            })
        );
        assert_eq!(h.transport.texts(), ["Something went wrong while running `fail`"]);
    }

    #[tokio::test]
    async fn test_handler_panic_caught() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDescriptor::new("boom", |_: Invocation| async {
                if true {
                    panic!("kaboom");
                }
                Ok::<_, CommandError>(Reply::Silent)
            }))
            .unwrap();
        registry.register(CommandDescriptor::new("echo", echo)).unwrap();
        let h = harness(registry, &Config::default());

        let outcome = h.dispatcher.handle(event(">boom")).await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(DispatchError::HandlerFailure { ref message, .. }) if message == "kaboom"
        ));

        // The dispatcher keeps working afterwards.
        assert_eq!(h.dispatcher.handle(event(">echo ok")).await, DispatchOutcome::Replied);
    }

    #[tokio::test]
    async fn test_group_without_handler_lists_subcommands() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::group("emoji")).unwrap();
        registry
            .register(CommandDescriptor::new("list", echo).parent("emoji").usage("[page]"))
            .unwrap();
        let h = harness(registry, &Config::default());

        assert_eq!(h.dispatcher.handle(event(">emoji")).await, DispatchOutcome::Replied);
        assert_eq!(h.transport.texts(), ["Subcommands of `emoji`:\n`emoji list [page]`"]);
    }

    #[tokio::test]
    async fn test_single_page_sent_without_affordances() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDescriptor::new("one", |_: Invocation| async {
                Ok::<_, CommandError>(Reply::Pages(PageSet::single(Page::new("only"))))
            }))
            .unwrap();
        let h = harness(registry, &Config::default());

        assert_eq!(h.dispatcher.handle(event(">one")).await, DispatchOutcome::Replied);
        assert!(h.supervisor.is_empty());
        assert!(matches!(
            h.transport.calls().as_slice(),
            [TransportCall::SendPage { affordances, .. }] if affordances.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_multiple_pages_open_session() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDescriptor::new("many", two_pages))
            .unwrap();
        let h = harness(registry, &Config::default());

        let DispatchOutcome::Paged(message) = h.dispatcher.handle(event(">many")).await else {
            panic!("expected a paging session");
        };
        assert!(h.supervisor.contains(&message));
        h.supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_undelivered_reply() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::new("echo", echo)).unwrap();
        let h = harness(registry, &Config::default());
        h.transport.fail_sends(true);

        assert!(matches!(
            h.dispatcher.handle(event(">echo x")).await,
            DispatchOutcome::Undelivered(_)
        ));
    }

    #[tokio::test]
    async fn test_mention_prefix_after_ready() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::new("echo", echo)).unwrap();
        let h = harness(registry, &Config::default());

        assert_eq!(h.dispatcher.handle(event("<@99> echo hi")).await, DispatchOutcome::Ignored);
        h.dispatcher.set_bot_user(UserId(99));
        assert_eq!(h.dispatcher.handle(event("<@99> echo hi")).await, DispatchOutcome::Replied);
        assert_eq!(h.dispatcher.handle(event(">echo hi")).await, DispatchOutcome::Replied);
    }
}
