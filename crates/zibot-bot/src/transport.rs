//! [`Transport`] implementation on top of the serenity HTTP client.

use async_trait::async_trait;
use serenity::all::{
    ChannelId as DiscordChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage, Http,
    MessageId as DiscordMessageId, ReactionType, UserId as DiscordUserId,
};
use std::sync::Arc;
use tracing::debug;
use zibot_commands::{Affordance, Page, Transport, TransportError};
use zibot_common::{truncate_string, ChannelId, MessageId, MessageRef, UserId};

const EMBED_COLOUR: u32 = 0x3498_DB;

// Discord embed limits, in characters.
const TITLE_LIMIT: usize = 256;
const DESCRIPTION_LIMIT: usize = 4096;
const FOOTER_LIMIT: usize = 2048;

/// Sends messages and reactions through Discord's REST API.
#[derive(Clone)]
pub struct SerenityTransport {
    http: Arc<Http>,
}

impl std::fmt::Debug for SerenityTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityTransport").finish_non_exhaustive()
    }
}

impl SerenityTransport {
    /// Creates a transport using `http`.
    pub const fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn channel(id: ChannelId) -> DiscordChannelId {
    DiscordChannelId::new(id.0)
}

fn message_id(id: MessageId) -> DiscordMessageId {
    DiscordMessageId::new(id.0)
}

fn reaction(affordance: Affordance) -> ReactionType {
    ReactionType::Unicode(affordance.emoji().to_string())
}

/// Cuts each part of a page down to what an embed accepts.
pub fn fit_page(page: &Page) -> Page {
    Page {
        title: page.title.as_deref().map(|title| truncate_string(title, TITLE_LIMIT)),
        body: truncate_string(&page.body, DESCRIPTION_LIMIT),
        footer: page.footer.as_deref().map(|footer| truncate_string(footer, FOOTER_LIMIT)),
    }
}

/// Builds the embed a page is shown as.
pub fn page_embed(page: &Page) -> CreateEmbed {
    let page = fit_page(page);
    let mut embed = CreateEmbed::new().description(&page.body).colour(EMBED_COLOUR);
    if let Some(title) = &page.title {
        embed = embed.title(title);
    }
    if let Some(footer) = &page.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    embed
}

/// Maps a serenity error onto the transport error vocabulary.
pub fn transport_error(error: &serenity::Error, message: Option<MessageRef>) -> TransportError {
    let status = match error {
        serenity::Error::Http(http) => http.status_code().map(|status| status.as_u16()),
        _ => None,
    };

    match (status, message) {
        (Some(404), Some(message)) => TransportError::UnknownMessage(message),
        (Some(403), _) => TransportError::Forbidden(error.to_string()),
        _ => TransportError::Platform(error.to_string()),
    }
}

fn sent(message: &serenity::all::Message) -> MessageRef {
    MessageRef::new(ChannelId(message.channel_id.get()), MessageId(message.id.get()))
}

#[async_trait]
impl Transport for SerenityTransport {
    async fn send_text(&self, destination: ChannelId, content: &str) -> Result<MessageRef, TransportError> {
        let message = channel(destination)
            .send_message(&*self.http, CreateMessage::new().content(content))
            .await
            .map_err(|e| transport_error(&e, None))?;
        Ok(sent(&message))
    }

    async fn send_page(
        &self,
        destination: ChannelId,
        page: &Page,
        affordances: &[Affordance],
    ) -> Result<MessageRef, TransportError> {
        let builder = CreateMessage::new()
            .embed(page_embed(page))
            .reactions(affordances.iter().copied().map(reaction));
        let message = channel(destination)
            .send_message(&*self.http, builder)
            .await
            .map_err(|e| transport_error(&e, None))?;
        Ok(sent(&message))
    }

    async fn edit_page(&self, message: MessageRef, page: &Page) -> Result<(), TransportError> {
        channel(message.channel)
            .edit_message(&*self.http, message_id(message.message), EditMessage::new().embed(page_embed(page)))
            .await
            .map_err(|e| transport_error(&e, Some(message)))?;
        Ok(())
    }

    async fn retract_affordances(&self, message: MessageRef) -> Result<(), TransportError> {
        match channel(message.channel)
            .delete_reactions(&*self.http, message_id(message.message))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => match transport_error(&e, Some(message)) {
                // Already gone counts as retracted.
                TransportError::UnknownMessage(_) => {
                    debug!("Message {} vanished before its reactions were cleared", message);
                    Ok(())
                }
                other => Err(other),
            },
        }
    }

    async fn remove_mark(
        &self,
        message: MessageRef,
        user: UserId,
        affordance: Affordance,
    ) -> Result<(), TransportError> {
        channel(message.channel)
            .delete_reaction(
                &*self.http,
                message_id(message.message),
                Some(DiscordUserId::new(user.0)),
                reaction(affordance),
            )
            .await
            .map_err(|e| transport_error(&e, Some(message)))
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), TransportError> {
        channel(message.channel)
            .delete_message(&*self.http, message_id(message.message))
            .await
            .map_err(|e| transport_error(&e, Some(message)))
    }
}
