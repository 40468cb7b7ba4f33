//! Command registry for managing bot commands
//!
//! Names and aliases share one case-insensitive namespace across the whole
//! registry, including subcommands. The registry is built once at startup and
//! only read afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::context::{AdmissionContext, CommandHandler};
use crate::cooldown::CooldownPolicy;

/// Index of a command inside its registry
pub type CommandId = usize;

/// Boolean authorization check evaluated before a handler runs
pub type Predicate = Arc<dyn Fn(&AdmissionContext) -> bool + Send + Sync>;

/// Errors raised while building or querying the registry
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The name or an alias is already taken
    #[error("Command name or alias '{0}' is already registered")]
    DuplicateName(String),

    /// The name or an alias is empty or contains whitespace
    #[error("Command name or alias '{0}' must be a single non-empty word")]
    InvalidName(String),

    /// The declared parent group does not exist
    #[error("Parent group '{0}' is not registered")]
    InvalidParent(String),

    /// No top-level command matches the first token
    #[error("There's no command called `{0}`")]
    NotFound(String),
}

/// Static description of a command
pub struct CommandDescriptor {
    name: String,
    aliases: Vec<String>,
    parent: Option<String>,
    description: Option<String>,
    usage: Option<String>,
    handler: Option<Arc<dyn CommandHandler>>,
    predicate: Option<Predicate>,
    cooldown: Option<CooldownPolicy>,
}

impl CommandDescriptor {
    /// A command with a handler
    pub fn new(name: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::group(name)
        }
    }

    /// A group without a handler of its own
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            parent: None,
            description: None,
            usage: None,
            handler: None,
            predicate: None,
            cooldown: None,
        }
    }

    /// Adds aliases
    #[must_use]
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Places the command under a group
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// One-line description for help output
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Argument synopsis, `()` required and `[]` optional
    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Admission predicate
    #[must_use]
    pub fn check<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&AdmissionContext) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Cooldown policy
    #[must_use]
    pub fn cooldown(mut self, policy: CooldownPolicy) -> Self {
        self.cooldown = Some(policy);
        self
    }

    /// Command name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aliases in declaration order
    pub fn alias_list(&self) -> &[String] {
        &self.aliases
    }

    /// Declared parent group
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Help description
    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Usage synopsis
    pub fn usage_text(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    /// Handler, `None` for plain groups
    pub fn handler(&self) -> Option<&Arc<dyn CommandHandler>> {
        self.handler.as_ref()
    }

    /// Cooldown policy
    pub const fn cooldown_policy(&self) -> Option<&CooldownPolicy> {
        self.cooldown.as_ref()
    }

    /// Evaluates the admission predicate; commands without one admit everybody
    pub fn admits(&self, context: &AdmissionContext) -> bool {
        self.predicate.as_ref().map_or(true, |predicate| predicate(context))
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parent", &self.parent)
            .field("has_handler", &self.handler.is_some())
            .field("has_predicate", &self.predicate.is_some())
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct RegisteredCommand {
    descriptor: CommandDescriptor,
    parent: Option<CommandId>,
    children: Vec<CommandId>,
    qualified_name: String,
}

/// A successful lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Resolved command
    pub id: CommandId,
    /// Tokens after the command path
    pub remaining: &'a [String],
}

/// Registry for managing bot commands
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<RegisteredCommand>,
    tokens: HashMap<String, CommandId>,
    roots: Vec<CommandId>,
}

impl CommandRegistry {
    /// Create a new command registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<CommandId, RegistryError> {
        let parent = match descriptor.parent_name() {
            Some(parent) => Some(
                self.lookup(parent)
                    .ok_or_else(|| RegistryError::InvalidParent(parent.to_string()))?,
            ),
            None => None,
        };

        let mut names: Vec<String> = Vec::with_capacity(descriptor.aliases.len() + 1);
        for name in std::iter::once(&descriptor.name).chain(&descriptor.aliases) {
            let key = name.to_lowercase();
            if key.is_empty() || key.chars().any(char::is_whitespace) {
                return Err(RegistryError::InvalidName(name.clone()));
            }
            if self.tokens.contains_key(&key) || names.contains(&key) {
                return Err(RegistryError::DuplicateName(name.clone()));
            }
            names.push(key);
        }

        let id = self.commands.len();
        let qualified_name = match parent {
            Some(parent) => format!("{} {}", self.commands[parent].qualified_name, descriptor.name),
            None => descriptor.name.clone(),
        };

        for key in names {
            self.tokens.insert(key, id);
        }
        match parent {
            Some(parent) => self.commands[parent].children.push(id),
            None => self.roots.push(id),
        }
        self.commands.push(RegisteredCommand {
            descriptor,
            parent,
            children: Vec::new(),
            qualified_name,
        });

        Ok(id)
    }

    /// Resolve whitespace-split input tokens to a command and its arguments
    pub fn resolve<'a>(&self, tokens: &'a [String]) -> Result<Resolution<'a>, RegistryError> {
        let Some(first) = tokens.first() else {
            return Err(RegistryError::NotFound(String::new()));
        };

        let mut current = match self.lookup(first) {
            Some(id) if self.commands[id].parent.is_none() => id,
            _ => return Err(RegistryError::NotFound(first.clone())),
        };

        let mut consumed = 1;
        for token in &tokens[1..] {
            match self.lookup(token) {
                Some(child) if self.commands[child].parent == Some(current) => {
                    current = child;
                    consumed += 1;
                }
                _ => break,
            }
        }

        Ok(Resolution {
            id: current,
            remaining: &tokens[consumed..],
        })
    }

    /// Find a command by name or alias, case-insensitively
    pub fn lookup(&self, token: &str) -> Option<CommandId> {
        self.tokens.get(&token.to_lowercase()).copied()
    }

    /// Descriptor of a command
    pub fn get(&self, id: CommandId) -> Option<&CommandDescriptor> {
        self.commands.get(id).map(|c| &c.descriptor)
    }

    /// Full name including parent groups, e.g. `emoji list`
    pub fn qualified_name(&self, id: CommandId) -> Option<&str> {
        self.commands.get(id).map(|c| c.qualified_name.as_str())
    }

    /// Top-level commands in registration order
    pub fn top_level(&self) -> impl Iterator<Item = CommandId> + '_ {
        self.roots.iter().copied()
    }

    /// Subcommands of a group in registration order
    pub fn children(&self, id: CommandId) -> &[CommandId] {
        self.commands.get(id).map_or(&[], |c| c.children.as_slice())
    }

    /// `name | alias | alias usage`, as shown by help
    pub fn signature(&self, id: CommandId) -> Option<String> {
        let command = self.commands.get(id)?;
        let mut signature = std::iter::once(command.qualified_name.as_str())
            .chain(command.descriptor.aliases.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" | ");
        if let Some(usage) = command.descriptor.usage_text() {
            signature.push(' ');
            signature.push_str(usage);
        }
        Some(signature)
    }

    /// Number of registered commands, including subcommands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
