//! Test utilities and shared test helpers for ziBot.
//!
//! This module provides common testing utilities and fixtures that can be used
//! across all crates in the workspace for unit and integration testing.

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Chat-platform identifiers for tests.
pub mod discord_fixtures {
    use crate::{ChannelId, GuildId, Origin, UserId};

    /// Create a test channel ID.
    pub fn test_channel_id() -> ChannelId {
        ChannelId(123456789012345678)
    }

    /// Create a test guild ID.
    pub fn test_guild_id() -> GuildId {
        GuildId(745481731133669476)
    }

    /// Create a test user ID.
    pub fn test_user_id() -> UserId {
        UserId(987654321098765432)
    }

    /// A guild origin using the test channel and guild.
    pub fn test_origin() -> Origin {
        Origin::guild(test_channel_id(), test_guild_id())
    }
}

/// Configuration-related test utilities.
pub mod config_fixtures {
    /// Create a minimal valid test configuration as YAML string.
    pub fn minimal_config_yaml() -> &'static str {
        r#"
discord:
  token: "test_token"
"#
    }

    /// Create a full test configuration as YAML string.
    pub fn full_config_yaml() -> &'static str {
        concat!(
            "discord:\n",
            "  token: \"test_token_full\"\n",
            "  prefixes: [\">\", \"$>\"]\n",
            "  mention_prefix: true\n",
            "  owner_ids: [186713080841895936]\n",
            "\n",
            "paging:\n",
            "  inactivity_timeout_seconds: 90\n",
            "  sweep_interval_seconds: 10\n",
            "  navigate_on_removal: false\n",
            "  remove_user_marks: true\n",
            "\n",
            "rate_limiting:\n",
            "  exempt_guild_ids: [745481731133669476, 747984453585993808]\n",
            "  eviction_interval_seconds: 120\n",
            "  delete_throttle_notice: false\n",
            "\n",
            "logging:\n",
            "  level: \"debug\"\n",
            "  format: \"json\"\n"
        )
    }
}
