//! What a command handler receives and returns.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use zibot_common::{Origin, UserId};

use crate::paging::PageSet;
use crate::registry::CommandRegistry;

/// Error type for commands
pub type CommandError = Box<dyn std::error::Error + Send + Sync>;

/// Result of running a command handler
pub type CommandResult = Result<Reply, CommandError>;

/// Who is asking and from where; the input to admission predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionContext {
    /// Invoking user
    pub invoker: UserId,
    /// Where the invocation came from
    pub origin: Origin,
}

/// A single resolved command invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Qualified name of the resolved command, e.g. `emoji list`
    pub command: String,
    /// Invoking user
    pub invoker: UserId,
    /// Where the invocation came from
    pub origin: Origin,
    /// Tokens following the command path
    pub args: Vec<String>,
    /// The registry the command was resolved from
    pub registry: Arc<CommandRegistry>,
}

impl Invocation {
    /// Admission view of this invocation
    pub const fn admission(&self) -> AdmissionContext {
        AdmissionContext {
            invoker: self.invoker,
            origin: self.origin,
        }
    }

    /// Mention string for the invoker
    pub fn mention(&self) -> String {
        format!("<@{}>", self.invoker)
    }
}

/// What a handler wants sent back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A plain text response
    Text(String),
    /// Paged output; more than one page becomes an interactive session
    Pages(PageSet),
    /// The handler already took care of everything
    Silent,
}

impl Reply {
    /// Shorthand for a text reply
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }
}

/// A command body
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs the command
    async fn call(&self, invocation: Invocation) -> CommandResult;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    async fn call(&self, invocation: Invocation) -> CommandResult {
        (self)(invocation).await
    }
}
