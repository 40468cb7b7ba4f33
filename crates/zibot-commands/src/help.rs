//! Paged help command.

use crate::context::{CommandResult, Invocation, Reply};
use crate::paging::{Page, PageSet};
use crate::registry::{CommandDescriptor, CommandId, CommandRegistry, RegistryError};

/// Commands listed per help page.
pub const COMMANDS_PER_PAGE: usize = 5;

const LEGEND: &str = "`()` = Required\n`[]` = Optional";
const ENDING_NOTE: &str = "Use help [command] for more info on a command.";

/// Lists commands, or describes one.
pub fn help() -> CommandDescriptor {
    CommandDescriptor::new("help", help_command)
        .aliases(["h"])
        .description("Show help about the bot or a command")
        .usage("[command]")
}

async fn help_command(invocation: Invocation) -> CommandResult {
    let registry = &invocation.registry;
    let visible = |id: CommandId| registry.get(id).is_some_and(|d| d.admits(&invocation.admission()));

    if invocation.args.is_empty() {
        let commands: Vec<CommandId> = registry.top_level().filter(|id| visible(*id)).collect();
        return Ok(Reply::Pages(bot_help(registry, &commands)?));
    }

    let resolution = match registry.resolve(&invocation.args) {
        Ok(resolution) => resolution,
        Err(RegistryError::NotFound(name)) => return Ok(Reply::Text(format!("There's no command called `{name}`"))),
        Err(e) => return Err(e.into()),
    };
    let id = resolution.id;
    let name = registry.qualified_name(id).unwrap_or_default();
    if !visible(id) {
        return Ok(Reply::Text(format!("There's no command called `{name}`")));
    }

    if let Some(extra) = resolution.remaining.first() {
        return Ok(Reply::Text(if registry.children(id).is_empty() {
            format!("Command `{name}` has no subcommands")
        } else {
            format!("Command `{name}` has no subcommand called `{extra}`")
        }));
    }

    Ok(Reply::Pages(PageSet::single(command_help(registry, id, &visible))))
}

fn entry(registry: &CommandRegistry, id: CommandId) -> String {
    let signature = registry.signature(id).unwrap_or_default();
    let description = registry
        .get(id)
        .and_then(|d| d.description_text())
        .unwrap_or("No description.");
    format!("**{signature}**\n{description}")
}

fn bot_help(registry: &CommandRegistry, commands: &[CommandId]) -> Result<PageSet, crate::paging::PagingError> {
    let pages = commands
        .chunks(COMMANDS_PER_PAGE)
        .map(|chunk| {
            let entries: Vec<String> = chunk.iter().map(|id| entry(registry, *id)).collect();
            Page::new(format!("{LEGEND}\n\n{}", entries.join("\n\n")))
                .title("Bot Commands")
                .footer(ENDING_NOTE)
        })
        .collect();
    PageSet::new(pages)
}

fn command_help(registry: &CommandRegistry, id: CommandId, visible: &dyn Fn(CommandId) -> bool) -> Page {
    let name = registry.qualified_name(id).unwrap_or_default();
    let mut body = format!("{LEGEND}\n\n{}", entry(registry, id));

    let children: Vec<String> = registry
        .children(id)
        .iter()
        .filter(|child| visible(**child))
        .map(|child| entry(registry, *child))
        .collect();
    if !children.is_empty() {
        body.push_str("\n\n__Subcommands__\n");
        body.push_str(&children.join("\n\n"));
    }

    Page::new(body)
        .title(format!("Help with {name} command"))
        .footer(ENDING_NOTE)
}
