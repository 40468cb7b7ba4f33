//! Dice and coin commands.

use rand::Rng;
use std::time::Duration;
use zibot_config::Config;

use crate::context::{CommandResult, Invocation, Reply};
use crate::cooldown::CooldownPolicy;
use crate::registry::CommandDescriptor;

/// Most dice a single `roll` may throw.
pub const MAX_DICE: u32 = 100;

const DEFAULT_DICE_SIZE: u32 = 6;
const ROLL_USAGE: &str = "[dice size] [number of dice]";

fn five_second_cooldown() -> CooldownPolicy {
    CooldownPolicy::global(1, Duration::from_secs(5))
}

/// Flips a coin.
pub fn flip() -> CommandDescriptor {
    CommandDescriptor::new("flip", flip_command)
        .description("Flip a coin")
        .cooldown(five_second_cooldown())
}

/// Rolls dice, `roll 2` or `roll d12 4`.
pub fn roll() -> CommandDescriptor {
    CommandDescriptor::new("roll", roll_command)
        .description("Roll the dice")
        .usage(ROLL_USAGE)
        .cooldown(five_second_cooldown())
}

/// Rolls a single number between 0 and the given pool.
///
/// Guilds listed in `rate_limiting.exempt_guild_ids` skip its cooldown.
pub fn steveroll(config: &Config) -> CommandDescriptor {
    let exempt = config.rate_limiting.exempt_guild_ids.iter().copied();
    CommandDescriptor::new("steveroll", steveroll_command)
        .aliases(["r", "sroll"])
        .description("Roll the dice in steve's style")
        .usage("(number of roll)")
        .cooldown(five_second_cooldown().exempt(exempt))
}

/// Parsed `roll` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceRequest {
    /// Faces per die.
    pub size: u32,
    /// Number of dice.
    pub count: u32,
}

/// Why `roll` arguments were refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    /// More than [`MAX_DICE`] dice.
    #[error("You can only roll up to 100 dice!")]
    TooMany,
    /// Unparsable arguments.
    #[error("Usage: `roll [dice size] [number of dice]`, e.g. `roll 2` or `roll d12 4`")]
    Invalid,
}

impl DiceRequest {
    /// Parses `[count]` or `d<size> [count]`.
    pub fn parse(args: &[String]) -> Result<Self, DiceError> {
        let (size, count) = match args {
            [] => (DEFAULT_DICE_SIZE, 1),
            [first, rest @ ..] => {
                if let Some(size) = first.strip_prefix('d').or_else(|| first.strip_prefix('D')) {
                    let size = size.parse().map_err(|_| DiceError::Invalid)?;
                    let count = match rest.first() {
                        Some(count) => count.parse().map_err(|_| DiceError::Invalid)?,
                        None => 1,
                    };
                    (size, count)
                } else {
                    (DEFAULT_DICE_SIZE, first.parse().map_err(|_| DiceError::Invalid)?)
                }
            }
        };

        if size == 0 || count == 0 {
            return Err(DiceError::Invalid);
        }
        if count > MAX_DICE {
            return Err(DiceError::TooMany);
        }
        Ok(Self { size, count })
    }

    /// Throws the dice.
    pub fn throw<R: Rng>(self, rng: &mut R) -> Vec<u32> {
        (0..self.count).map(|_| rng.gen_range(1..=self.size)).collect()
    }
}

async fn flip_command(invocation: Invocation) -> CommandResult {
    let side = if rand::thread_rng().gen_bool(0.5) { "heads" } else { "tails" };
    Ok(Reply::Text(format!("{} {}", invocation.mention(), side)))
}

async fn roll_command(invocation: Invocation) -> CommandResult {
    let request = match DiceRequest::parse(&invocation.args) {
        Ok(request) => request,
        Err(e) => return Ok(Reply::Text(e.to_string())),
    };
    let dice = request
        .throw(&mut rand::thread_rng())
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Ok(Reply::Text(format!("{} just rolled {}!", invocation.mention(), dice)))
}

async fn steveroll_command(invocation: Invocation) -> CommandResult {
    let Some(pool) = invocation.args.first().and_then(|arg| arg.parse::<u64>().ok()) else {
        return Ok(Reply::text("Usage: `steveroll (number of roll)`"));
    };
    let rolled = rand::thread_rng().gen_range(0..=pool);
    Ok(Reply::Text(format!("{} just rolled {}", invocation.mention(), rolled)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooldown::{Admission, RateLimiter};
    use crate::registry::CommandRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use tokio::time::Instant;
    use zibot_common::test_utils::discord_fixtures::{test_guild_id, test_origin, test_user_id};
    use zibot_common::{ChannelId, GuildId, Origin};

    fn args(input: &[&str]) -> Vec<String> {
        input.iter().map(ToString::to_string).collect()
    }

    fn invocation(command: &str, input: &[&str]) -> Invocation {
        Invocation {
            command: command.to_string(),
            invoker: test_user_id(),
            origin: test_origin(),
            args: args(input),
            registry: Arc::new(CommandRegistry::new()),
        }
    }

    #[test]
    fn test_parse_dice() {
        assert_eq!(DiceRequest::parse(&[]), Ok(DiceRequest { size: 6, count: 1 }));
        assert_eq!(DiceRequest::parse(&args(&["2"])), Ok(DiceRequest { size: 6, count: 2 }));
        assert_eq!(DiceRequest::parse(&args(&["d12", "4"])), Ok(DiceRequest { size: 12, count: 4 }));
        assert_eq!(DiceRequest::parse(&args(&["d20"])), Ok(DiceRequest { size: 20, count: 1 }));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(DiceRequest::parse(&args(&["101"])), Err(DiceError::TooMany));
        assert_eq!(DiceRequest::parse(&args(&["d6", "500"])), Err(DiceError::TooMany));
        assert_eq!(DiceRequest::parse(&args(&["lots"])), Err(DiceError::Invalid));
        assert_eq!(DiceRequest::parse(&args(&["d0"])), Err(DiceError::Invalid));
        assert_eq!(DiceRequest::parse(&args(&["0"])), Err(DiceError::Invalid));
    }

    #[test]
    fn test_throw_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let dice = DiceRequest { size: 12, count: 100 }.throw(&mut rng);
        assert_eq!(dice.len(), 100);
        assert!(dice.iter().all(|d| (1..=12).contains(d)));
    }

    #[tokio::test]
    async fn test_roll_reply() {
        let reply = roll_command(invocation("roll", &["d1", "3"])).await.unwrap();
        assert_eq!(reply, Reply::Text(format!("<@{}> just rolled 1, 1, 1!", test_user_id())));

        let reply = roll_command(invocation("roll", &["150"])).await.unwrap();
        assert_eq!(reply, Reply::text("You can only roll up to 100 dice!"));
    }

    #[tokio::test]
    async fn test_flip_reply() {
        let Reply::Text(text) = flip_command(invocation("flip", &[])).await.unwrap() else {
            panic!("expected text");
        };
        assert!(text.ends_with("heads") || text.ends_with("tails"));
    }

    #[tokio::test]
    async fn test_steveroll_reply() {
        let reply = steveroll_command(invocation("steveroll", &["0"])).await.unwrap();
        assert_eq!(reply, Reply::Text(format!("<@{}> just rolled 0", test_user_id())));

        let reply = steveroll_command(invocation("steveroll", &[])).await.unwrap();
        assert_eq!(reply, Reply::text("Usage: `steveroll (number of roll)`"));
    }

    #[test]
    fn test_steveroll_exemption_from_config() {
        let mut config = Config::default();
        config.rate_limiting.exempt_guild_ids = vec![test_guild_id()];
        let descriptor = steveroll(&config);
        let policy = descriptor.cooldown_policy().unwrap();
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.check("steveroll", policy, test_user_id(), &test_origin(), now), Admission::Admit);
        }

        let elsewhere = Origin::guild(ChannelId(11), GuildId(12));
        assert_eq!(limiter.check("steveroll", policy, test_user_id(), &elsewhere, now), Admission::Admit);
        assert!(matches!(
            limiter.check("steveroll", policy, test_user_id(), &elsewhere, now),
            Admission::Reject { .. }
        ));
    }
}
