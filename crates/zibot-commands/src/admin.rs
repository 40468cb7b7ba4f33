//! Owner-only commands.

use std::sync::Arc;

use crate::context::{CommandError, Invocation, Reply};
use crate::framework::Data;
use crate::registry::{CommandDescriptor, CommandRegistry, RegistryError};

/// Registers the `admin` group and its subcommands.
pub fn register(registry: &mut CommandRegistry, data: &Arc<Data>) -> Result<(), RegistryError> {
    let owners = data.clone();
    registry.register(
        CommandDescriptor::group("admin")
            .description("Bot owner tools")
            .check(move |ctx| owners.is_owner(ctx.invoker)),
    )?;
    registry.register(stats(data))?;
    Ok(())
}

/// Shows paging and cooldown bookkeeping.
fn stats(data: &Arc<Data>) -> CommandDescriptor {
    let owners = data.clone();
    let data = data.clone();
    CommandDescriptor::new("stats", move |_: Invocation| {
        let text = stats_text(&data);
        async move { Ok::<_, CommandError>(Reply::Text(text)) }
    })
    .parent("admin")
    .description("Show live sessions and cooldown windows")
    .check(move |ctx| owners.is_owner(ctx.invoker))
}

fn stats_text(data: &Data) -> String {
    format!(
        "Paging sessions: {} live, {} closed\nCooldown windows: {} tracked",
        data.supervisor.len(),
        data.supervisor.closed_count(),
        data.limiter.active_windows(),
    )
}
