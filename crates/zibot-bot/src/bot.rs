//! Bot assembly and lifecycle.

use crate::error::BotResult;
use crate::handler::Handler;
use crate::transport::SerenityTransport;
use chrono::Utc;
use serenity::all::{Client, GatewayIntents, Http};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zibot_commands::{create_registry, Data, Dispatcher, RateLimiter, SessionSupervisor, Transport};
use zibot_config::Config;

/// Gateway intents the bot needs: text commands and reactions in guilds and DMs.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGE_REACTIONS
}

/// Everything that runs independently of the gateway connection.
#[derive(Debug, Clone)]
pub struct Core {
    /// Text command entry point.
    pub dispatcher: Arc<Dispatcher>,
    /// Live paging sessions.
    pub supervisor: SessionSupervisor,
    /// Cooldown state.
    pub limiter: Arc<RateLimiter>,
}

impl Core {
    /// Wires the registry, limiter, supervisor and dispatcher over `transport`.
    pub fn build(config: Arc<Config>, transport: Arc<dyn Transport>) -> BotResult<Self> {
        let supervisor = SessionSupervisor::new(transport.clone(), config.paging.clone());
        let limiter = Arc::new(RateLimiter::new());
        let data = Arc::new(Data {
            config: config.clone(),
            started_at: Utc::now(),
            supervisor: supervisor.clone(),
            limiter: limiter.clone(),
        });

        let registry = Arc::new(create_registry(&data)?);
        info!("Registered {} commands", registry.len());

        let dispatcher = Arc::new(Dispatcher::new(
            registry,
            limiter.clone(),
            supervisor.clone(),
            transport,
            &config,
        ));

        Ok(Self {
            dispatcher,
            supervisor,
            limiter,
        })
    }

    /// Starts the idle-session sweeper and the cooldown evictor.
    pub fn spawn_maintenance(&self, config: &Config, shutdown: &CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            self.supervisor
                .spawn_sweeper(config.paging.sweep_interval(), shutdown.clone()),
            self.limiter
                .clone()
                .spawn_evictor(config.rate_limiting.eviction_interval(), shutdown.clone()),
        ]
    }

    /// Stops maintenance and tears down every paging session.
    pub async fn shutdown(&self, shutdown: &CancellationToken, maintenance: Vec<JoinHandle<()>>) {
        shutdown.cancel();
        for task in maintenance {
            if let Err(e) = task.await {
                warn!("Maintenance task ended abnormally: {}", e);
            }
        }
        self.supervisor.shutdown().await;
    }
}

/// Main bot structure.
pub struct ZiBot {
    config: Arc<Config>,
}

impl ZiBot {
    /// Creates a new bot instance.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Connects to Discord and runs until the gateway closes or Ctrl-C is pressed.
    pub async fn start(&self) -> BotResult<()> {
        let token = &self.config.discord.token;
        let http = Arc::new(Http::new(token));
        let core = Core::build(self.config.clone(), Arc::new(SerenityTransport::new(http)))?;

        let shutdown = CancellationToken::new();
        let maintenance = core.spawn_maintenance(&self.config, &shutdown);

        let handler = Handler::new(core.dispatcher.clone(), core.supervisor.clone());
        let mut client = Client::builder(token, intents()).event_handler(handler).await?;

        let shard_manager = client.shard_manager.clone();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => info!("Received Ctrl-C, shutting down"),
                    Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
                },
                () = signal.cancelled() => {}
            }
            shard_manager.shutdown_all().await;
        });

        info!("Connecting to Discord");
        let result = client.start().await;

        core.shutdown(&shutdown, maintenance).await;
        info!("ziBot stopped");
        result.map_err(Into::into)
    }
}
