//! Outbound operations against the chat platform.
//!
//! The core never talks to the network itself; everything it needs from the
//! platform goes through [`Transport`].

use async_trait::async_trait;
use thiserror::Error;
use zibot_common::{ChannelId, MessageRef, UserId};

use crate::paging::Page;

/// Interactive markers attached to a paged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affordance {
    /// Go to the previous page.
    Backward,
    /// Go to the next page.
    Forward,
    /// Dismiss the paged message.
    Stop,
}

impl Affordance {
    /// All affordances in the order they are attached.
    pub const ALL: [Self; 3] = [Self::Backward, Self::Forward, Self::Stop];

    /// The reaction emoji representing this affordance.
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Backward => "◀️",
            Self::Forward => "▶️",
            Self::Stop => "⏹️",
        }
    }

    /// Maps a reaction emoji back to an affordance.
    ///
    /// Clients do not always send the variation selector, so the bare
    /// symbols are accepted too.
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        match emoji.trim_end_matches('\u{fe0f}') {
            "◀" => Some(Self::Backward),
            "▶" => Some(Self::Forward),
            "⏹" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Errors reported by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The message or channel no longer exists.
    #[error("Message {0} does not exist")]
    UnknownMessage(MessageRef),

    /// The bot lacks a permission for the operation.
    #[error("Missing permission: {0}")]
    Forbidden(String),

    /// Any other platform failure.
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Operations the core performs on the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a plain text message.
    async fn send_text(&self, destination: ChannelId, content: &str) -> Result<MessageRef, TransportError>;

    /// Sends a page and attaches the given affordances to it.
    async fn send_page(
        &self,
        destination: ChannelId,
        page: &Page,
        affordances: &[Affordance],
    ) -> Result<MessageRef, TransportError>;

    /// Replaces the content of a previously sent page.
    async fn edit_page(&self, message: MessageRef, page: &Page) -> Result<(), TransportError>;

    /// Removes every affordance from a message. Must succeed when called twice.
    async fn retract_affordances(&self, message: MessageRef) -> Result<(), TransportError>;

    /// Removes one user's mark on an affordance so it can be pressed again.
    async fn remove_mark(
        &self,
        message: MessageRef,
        user: UserId,
        affordance: Affordance,
    ) -> Result<(), TransportError>;

    /// Deletes a message the bot sent.
    async fn delete_message(&self, message: MessageRef) -> Result<(), TransportError>;
}
