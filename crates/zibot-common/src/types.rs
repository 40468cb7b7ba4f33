//! Common type definitions and newtype wrappers for domain modeling.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

snowflake!(
    /// A chat platform channel ID.
    ChannelId
);

snowflake!(
    /// A chat platform user ID.
    UserId
);

snowflake!(
    /// A guild (server) ID, the group a channel belongs to.
    GuildId
);

snowflake!(
    /// A chat platform message ID.
    MessageId
);

/// Identity of a message the bot has posted.
///
/// Editing or reacting to a message needs both the channel and the message,
/// so the pair is the key the paging layer stores sessions under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Channel hosting the message.
    pub channel: ChannelId,
    /// The message itself.
    pub message: MessageId,
}

impl MessageRef {
    /// Creates a new message reference.
    pub const fn new(channel: ChannelId, message: MessageId) -> Self {
        Self { channel, message }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.message)
    }
}

/// Where an invocation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// Channel the event was posted in.
    pub channel: ChannelId,
    /// Guild owning the channel, `None` for direct messages.
    pub guild: Option<GuildId>,
}

impl Origin {
    /// An origin inside a guild channel.
    pub const fn guild(channel: ChannelId, guild: GuildId) -> Self {
        Self {
            channel,
            guild: Some(guild),
        }
    }

    /// A direct message origin.
    pub const fn direct(channel: ChannelId) -> Self {
        Self {
            channel,
            guild: None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.guild {
            Some(guild) => write!(f, "{guild}/{}", self.channel),
            None => write!(f, "dm/{}", self.channel),
        }
    }
}

/// Common result type for the application.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Application-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum ZiError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat platform API error.
    #[error("Discord API error: {0}")]
    Discord(String),

    /// Logging setup error.
    #[error("Logging error: {0}")]
    Logging(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ZiError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
