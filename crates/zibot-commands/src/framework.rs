//! Built-in command setup and registration.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use zibot_common::UserId;
use zibot_config::Config;

use crate::cooldown::RateLimiter;
use crate::paging::SessionSupervisor;
use crate::registry::{CommandRegistry, RegistryError};

/// Application data shared by the built-in commands.
#[derive(Debug, Clone)]
pub struct Data {
    /// Application configuration.
    pub config: Arc<Config>,
    /// When the bot started.
    pub started_at: DateTime<Utc>,
    /// Live paging sessions.
    pub supervisor: SessionSupervisor,
    /// Cooldown state.
    pub limiter: Arc<RateLimiter>,
}

impl Data {
    /// Whether `user` is one of the configured owners.
    pub fn is_owner(&self, user: UserId) -> bool {
        self.config.discord.owner_ids.contains(&user)
    }
}

/// Registers every built-in command.
pub fn register_builtins(registry: &mut CommandRegistry, data: &Arc<Data>) -> Result<(), RegistryError> {
    registry.register(crate::about::ping())?;
    registry.register(crate::about::about())?;
    registry.register(crate::uptime::uptime(data))?;
    registry.register(crate::fun::flip())?;
    registry.register(crate::fun::roll())?;
    registry.register(crate::fun::steveroll(&data.config))?;
    registry.register(crate::help::help())?;
    crate::admin::register(registry, data)?;
    Ok(())
}

/// Creates a registry holding the built-in commands.
pub fn create_registry(data: &Arc<Data>) -> Result<CommandRegistry, RegistryError> {
    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry, data)?;
    Ok(registry)
}
