//! Gateway event handler feeding the dispatcher and the paging supervisor.

use async_trait::async_trait;
use serenity::all::{Context, EventHandler, Message, Reaction, ReactionType, Ready};
use std::sync::{Arc, OnceLock};
use tokio::time::Instant;
use tracing::{debug, info};
use zibot_commands::{DispatchOutcome, Dispatcher, ReactionEvent, RouteOutcome, SessionSupervisor, TextEvent};
use zibot_common::{ChannelId, GuildId, MessageId, MessageRef, Origin, UserId};

/// Translates serenity events into core events.
pub struct Handler {
    dispatcher: Arc<Dispatcher>,
    supervisor: SessionSupervisor,
    bot_user: OnceLock<UserId>,
}

impl Handler {
    /// Creates a handler.
    pub const fn new(dispatcher: Arc<Dispatcher>, supervisor: SessionSupervisor) -> Self {
        Self {
            dispatcher,
            supervisor,
            bot_user: OnceLock::new(),
        }
    }

    fn is_self(&self, user: UserId) -> bool {
        self.bot_user.get() == Some(&user)
    }
}

/// Where a message was posted.
pub fn origin(channel: u64, guild: Option<u64>) -> Origin {
    match guild {
        Some(guild) => Origin::guild(ChannelId(channel), GuildId(guild)),
        None => Origin::direct(ChannelId(channel)),
    }
}

/// Builds a reaction event. Custom emoji are never affordances and yield `None`.
pub fn reaction_event(
    message: MessageRef,
    reactor: Option<UserId>,
    emoji: &ReactionType,
    added: bool,
) -> Option<ReactionEvent> {
    let ReactionType::Unicode(emoji) = emoji else {
        return None;
    };
    Some(ReactionEvent {
        message,
        reactor: reactor?,
        emoji: emoji.clone(),
        added,
    })
}

impl Handler {
    async fn route(&self, reaction: &Reaction, added: bool) {
        let message = MessageRef::new(ChannelId(reaction.channel_id.get()), MessageId(reaction.message_id.get()));
        let reactor = reaction.user_id.map(|id| UserId(id.get()));
        if reactor.is_some_and(|user| self.is_self(user)) {
            return;
        }

        let Some(event) = reaction_event(message, reactor, &reaction.emoji, added) else {
            return;
        };
        match self.supervisor.route_reaction(event).await {
            RouteOutcome::Expired => debug!("Reaction on expired paging session {}", message),
            RouteOutcome::Delivered(snapshot) => {
                debug!(message = %message, index = snapshot.index, state = ?snapshot.state, "Reaction routed");
            }
            RouteOutcome::NoSession | RouteOutcome::Ignored => {}
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let bot = UserId(ready.user.id.get());
        let _ = self.bot_user.set(bot);
        self.dispatcher.set_bot_user(bot);
        info!("Connected as {} ({})", ready.user.name, bot);
    }

    async fn message(&self, _ctx: Context, message: Message) {
        if message.author.bot {
            return;
        }

        let event = TextEvent {
            content: message.content,
            author: UserId(message.author.id.get()),
            origin: origin(message.channel_id.get(), message.guild_id.map(|id| id.get())),
            timestamp: Instant::now(),
        };
        if let DispatchOutcome::Undelivered(reason) = self.dispatcher.handle(event).await {
            debug!("Reply to message {} was not delivered: {}", message.id, reason);
        }
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        self.route(&reaction, true).await;
    }

    async fn reaction_remove(&self, _ctx: Context, reaction: Reaction) {
        self.route(&reaction, false).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::EmojiId;

    fn message() -> MessageRef {
        MessageRef::new(ChannelId(1), MessageId(2))
    }

    #[test]
    fn test_unicode_reaction() {
        let emoji = ReactionType::Unicode("▶️".to_string());
        let event = reaction_event(message(), Some(UserId(3)), &emoji, true).unwrap();
        assert_eq!(event.emoji, "▶️");
        assert_eq!(event.reactor, UserId(3));
        assert!(event.added);
    }

    #[test]
    fn test_custom_emoji_and_unknown_user_dropped() {
        let custom = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(42),
            name: Some("pepe".to_string()),
        };
        assert!(reaction_event(message(), Some(UserId(3)), &custom, true).is_none());

        let unicode = ReactionType::Unicode("⏹️".to_string());
        assert!(reaction_event(message(), None, &unicode, false).is_none());
    }

    #[test]
    fn test_origin() {
        assert_eq!(origin(5, Some(6)), Origin::guild(ChannelId(5), GuildId(6)));
        assert_eq!(origin(5, None), Origin::direct(ChannelId(5)));
    }
}
