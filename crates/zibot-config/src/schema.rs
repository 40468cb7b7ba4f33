//! Configuration schema definitions using serde.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use zibot_common::{GuildId, LogFormat, LoggingConfig, UserId};

/// Main configuration structure for ziBot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord configuration.
    pub discord: DiscordConfig,
    /// Interactive paging configuration.
    pub paging: PagingConfig,
    /// Rate limiting configuration.
    pub rate_limiting: RateLimitingConfig,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Discord bot token.
    pub token: String,
    /// Text prefixes that mark a message as a command.
    pub prefixes: Vec<String>,
    /// Whether mentioning the bot also works as a prefix.
    pub mention_prefix: bool,
    /// Users allowed to run owner-only commands.
    pub owner_ids: Vec<UserId>,
}

/// Paging session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Idle time after which a paged message stops reacting.
    pub inactivity_timeout_seconds: u64,
    /// Interval of the idle-session sweep.
    pub sweep_interval_seconds: u64,
    /// Whether removing a reaction navigates like adding one.
    pub navigate_on_removal: bool,
    /// Whether the bot removes the user's reaction after handling it.
    pub remove_user_marks: bool,
}

impl PagingConfig {
    /// Idle timeout as a duration.
    pub const fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_seconds)
    }

    /// Sweep interval as a duration.
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    /// Guilds whose invocations never count against a cooldown.
    pub exempt_guild_ids: Vec<GuildId>,
    /// Interval at which fully elapsed cooldown windows are dropped.
    pub eviction_interval_seconds: u64,
    /// Whether throttle notices are deleted once the cooldown has passed.
    pub delete_throttle_notice: bool,
}

impl RateLimitingConfig {
    /// Eviction interval as a duration.
    pub const fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_seconds)
    }
}

/// Log output format as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    /// Human readable multi-line output.
    Pretty,
    /// Single-line output.
    Compact,
    /// JSON lines.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log filter directive.
    pub level: String,
    /// Output format.
    pub format: LogFormatSetting,
    /// Optional log file.
    pub file: Option<String>,
}

impl LoggingSettings {
    /// Converts the settings into the logging setup understood by `zibot_common`.
    pub fn to_logging_config(&self) -> LoggingConfig {
        let format = match self.format {
            LogFormatSetting::Pretty => LogFormat::Pretty,
            LogFormatSetting::Compact => LogFormat::Compact,
            LogFormatSetting::Json => LogFormat::Json,
        };

        LoggingConfig {
            level: self.level.clone(),
            format,
            file_path: self.file.clone(),
            ..LoggingConfig::default()
        }
    }
}
