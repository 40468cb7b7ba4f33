//! Default values for every configuration section.

use crate::schema::*;

/// Prefixes used when none are configured.
pub const DEFAULT_PREFIXES: [&str; 2] = [">", "$>"];

/// Idle time before a paged message is retired.
pub const DEFAULT_INACTIVITY_TIMEOUT_SECONDS: u64 = 60;

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            prefixes: DEFAULT_PREFIXES.iter().map(ToString::to_string).collect(),
            mention_prefix: true,
            owner_ids: Vec::new(),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_seconds: DEFAULT_INACTIVITY_TIMEOUT_SECONDS,
            sweep_interval_seconds: 15,
            navigate_on_removal: false,
            remove_user_marks: true,
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            exempt_guild_ids: Vec::new(),
            eviction_interval_seconds: 300,
            delete_throttle_notice: true,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormatSetting::Pretty,
            file: None,
        }
    }
}
