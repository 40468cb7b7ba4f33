//! Main entry point for ziBot.

use anyhow::Context;
use tracing::{error, info};
use zibot_bot::ZiBot;
use zibot_common::init_logging;
use zibot_config::ConfigLoader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_logging(&config.logging.to_logging_config()).context("Failed to initialize logging")?;

    info!("Starting ziBot v{}", env!("CARGO_PKG_VERSION"));

    let bot = ZiBot::new(config);
    if let Err(e) = bot.start().await {
        error!("Bot stopped with an error: {}", e);
        return Err(e).context("Bot failed");
    }

    Ok(())
}
