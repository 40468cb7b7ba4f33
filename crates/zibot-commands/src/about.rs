//! `ping` and `about` commands.

use crate::context::{CommandResult, Invocation, Reply};
use crate::registry::CommandDescriptor;

/// Replies with "Pong!".
pub fn ping() -> CommandDescriptor {
    CommandDescriptor::new("ping", ping_command)
        .aliases(["p"])
        .description("Ping the bot")
}

/// Shows information about the bot.
pub fn about() -> CommandDescriptor {
    CommandDescriptor::new("about", about_command)
        .aliases(["botinfo", "bi", "info"])
        .description("Information about the bot")
}

async fn ping_command(_invocation: Invocation) -> CommandResult {
    Ok(Reply::text("Pong!"))
}

async fn about_command(invocation: Invocation) -> CommandResult {
    let response = format!(
        "**ziBot** v{}\n\
         A multi-purpose Discord bot.\n\
         Built with Rust and serenity. {} commands loaded.",
        env!("CARGO_PKG_VERSION"),
        invocation.registry.len()
    );
    Ok(Reply::Text(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;
    use std::sync::Arc;
    use zibot_common::test_utils::discord_fixtures::{test_origin, test_user_id};

    fn invocation(registry: CommandRegistry) -> Invocation {
        Invocation {
            command: "about".to_string(),
            invoker: test_user_id(),
            origin: test_origin(),
            args: Vec::new(),
            registry: Arc::new(registry),
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let reply = ping_command(invocation(CommandRegistry::new())).await.unwrap();
        assert_eq!(reply, Reply::text("Pong!"));
    }

    #[tokio::test]
    async fn test_about_counts_commands() {
        let mut registry = CommandRegistry::new();
        registry.register(ping()).unwrap();
        registry.register(about()).unwrap();

        let Reply::Text(text) = about_command(invocation(registry)).await.unwrap() else {
            panic!("expected text");
        };
        assert!(text.contains("2 commands loaded"));
    }
}
