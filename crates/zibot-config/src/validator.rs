//! Runtime validation of a loaded configuration.

use crate::schema::Config;
use zibot_common::ZiError;

/// Upper bound for every timeout and interval, in seconds.
pub const MAX_INTERVAL_SECONDS: u64 = 86_400;

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration, reporting every problem found.
    pub fn validate(config: &Config) -> Result<(), ZiError> {
        let problems = Self::problems(config);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ZiError::config(problems.join("; ")))
        }
    }

    /// Lists every problem in the configuration.
    pub fn problems(config: &Config) -> Vec<String> {
        let mut problems = Vec::new();

        if config.discord.token.trim().is_empty() {
            problems.push("Discord token cannot be empty".to_string());
        }

        if config.discord.prefixes.is_empty() && !config.discord.mention_prefix {
            problems.push("At least one prefix or the mention prefix must be enabled".to_string());
        }

        for prefix in &config.discord.prefixes {
            if prefix.is_empty() {
                problems.push("Prefixes cannot be empty".to_string());
            } else if prefix.chars().any(char::is_whitespace) {
                problems.push(format!("Prefix '{prefix}' cannot contain whitespace"));
            }
        }

        if config.paging.inactivity_timeout_seconds == 0 {
            problems.push("paging.inactivity_timeout_seconds must be greater than 0".to_string());
        } else if config.paging.inactivity_timeout_seconds > MAX_INTERVAL_SECONDS {
            problems.push(format!("paging.inactivity_timeout_seconds must be at most {MAX_INTERVAL_SECONDS}"));
        }

        if config.paging.sweep_interval_seconds == 0 {
            problems.push("paging.sweep_interval_seconds must be greater than 0".to_string());
        } else if config.paging.sweep_interval_seconds > MAX_INTERVAL_SECONDS {
            problems.push(format!("paging.sweep_interval_seconds must be at most {MAX_INTERVAL_SECONDS}"));
        }

        // The bot's own mark removal fires a removal event for the same user.
        if config.paging.navigate_on_removal && config.paging.remove_user_marks {
            problems.push(
                "paging.navigate_on_removal cannot be combined with paging.remove_user_marks"
                    .to_string(),
            );
        }

        if config.rate_limiting.eviction_interval_seconds == 0 {
            problems.push("rate_limiting.eviction_interval_seconds must be greater than 0".to_string());
        } else if config.rate_limiting.eviction_interval_seconds > MAX_INTERVAL_SECONDS {
            problems.push(format!("rate_limiting.eviction_interval_seconds must be at most {MAX_INTERVAL_SECONDS}"));
        }

        problems
    }
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ZiError> {
        ConfigValidator::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.discord.token = "token".to_string();
        config
    }

    #[test]
    fn test_default_config_needs_token() {
        let config = Config::default();
        let problems = ConfigValidator::problems(&config);
        assert_eq!(problems, vec!["Discord token cannot be empty".to_string()]);
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_whitespace_prefix_rejected() {
        let mut config = valid_config();
        config.discord.prefixes = vec!["z !".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot contain whitespace"));
    }

    #[test]
    fn test_no_prefix_at_all_rejected() {
        let mut config = valid_config();
        config.discord.prefixes.clear();
        config.discord.mention_prefix = false;
        assert!(config.validate().is_err());

        config.discord.mention_prefix = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_removal_navigation_conflicts_with_mark_removal() {
        let mut config = valid_config();
        config.paging.navigate_on_removal = true;
        assert!(config.validate().is_err());

        config.paging.remove_user_marks = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = valid_config();
        config.paging.inactivity_timeout_seconds = 0;
        config.paging.sweep_interval_seconds = 0;
        config.rate_limiting.eviction_interval_seconds = 0;
        assert_eq!(ConfigValidator::problems(&config).len(), 3);
    }

    #[test]
    fn test_oversized_intervals_rejected() {
        let mut config = valid_config();
        config.paging.inactivity_timeout_seconds = u64::MAX;
        config.paging.sweep_interval_seconds = MAX_INTERVAL_SECONDS + 1;
        config.rate_limiting.eviction_interval_seconds = u64::MAX;
        let problems = ConfigValidator::problems(&config);
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("at most 86400"));

        config.paging.inactivity_timeout_seconds = MAX_INTERVAL_SECONDS;
        config.paging.sweep_interval_seconds = MAX_INTERVAL_SECONDS;
        config.rate_limiting.eviction_interval_seconds = MAX_INTERVAL_SECONDS;
        assert!(config.validate().is_ok());
    }
}
