//! Integration tests for zibot-bot crate.
//!
//! These tests assemble the bot core over a recording transport and drive it
//! with the same events the gateway handler produces.

use serenity::all::ReactionType;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use zibot_bot::{intents, origin, reaction_event, Core};
use zibot_commands::testing::{RecordingTransport, TransportCall};
use zibot_commands::{Affordance, DispatchOutcome, RouteOutcome, SessionState, TextEvent};
use zibot_common::test_utils::{discord_fixtures, init_test_logging};
use zibot_common::UserId;
use zibot_config::Config;

fn core() -> (Core, Arc<RecordingTransport>, Arc<Config>) {
    let config = Arc::new(Config::default());
    let transport = Arc::new(RecordingTransport::new());
    let core = Core::build(config.clone(), transport.clone()).unwrap();
    (core, transport, config)
}

fn text(content: &str, author: UserId) -> TextEvent {
    TextEvent {
        content: content.to_string(),
        author,
        origin: origin(
            discord_fixtures::test_channel_id().0,
            Some(discord_fixtures::test_guild_id().0),
        ),
        timestamp: Instant::now(),
    }
}

#[tokio::test]
async fn test_help_session_driven_by_reactions() {
    init_test_logging();
    let (core, transport, _config) = core();
    let user = discord_fixtures::test_user_id();

    let DispatchOutcome::Paged(message) = core.dispatcher.handle(text(">help", user)).await else {
        panic!("help should open a paging session");
    };

    let forward = ReactionType::Unicode(Affordance::Forward.emoji().to_string());
    let event = reaction_event(message, Some(user), &forward, true).unwrap();
    match core.supervisor.route_reaction(event).await {
        RouteOutcome::Delivered(snapshot) => assert_eq!(snapshot.index, 1),
        other => panic!("unexpected outcome {other:?}"),
    }

    let stop = ReactionType::Unicode("⏹".to_string());
    let event = reaction_event(message, Some(user), &stop, true).unwrap();
    match core.supervisor.route_reaction(event).await {
        RouteOutcome::Delivered(snapshot) => assert_eq!(snapshot.state, SessionState::Closed),
        other => panic!("unexpected outcome {other:?}"),
    }

    assert_eq!(transport.retractions(message), 1);
    let footers: Vec<_> = transport
        .pages_on(message)
        .into_iter()
        .filter_map(|page| page.footer)
        .collect();
    assert!(footers[0].starts_with("Page 1/2"));
    assert!(footers[1].starts_with("Page 2/2"));
}

#[tokio::test]
async fn test_mention_prefix_enabled_on_ready() {
    let (core, transport, _config) = core();
    let user = discord_fixtures::test_user_id();

    assert_eq!(
        core.dispatcher.handle(text("<@!777> ping", user)).await,
        DispatchOutcome::Ignored
    );
    core.dispatcher.set_bot_user(UserId(777));
    assert_eq!(
        core.dispatcher.handle(text("<@!777> ping", user)).await,
        DispatchOutcome::Replied
    );
    assert_eq!(transport.texts(), ["Pong!"]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_sessions_and_stops_maintenance() {
    let (core, transport, config) = core();
    let token = CancellationToken::new();
    let maintenance = core.spawn_maintenance(&config, &token);

    let user = discord_fixtures::test_user_id();
    let DispatchOutcome::Paged(message) = core.dispatcher.handle(text(">help", user)).await else {
        panic!("help should open a paging session");
    };

    tokio::time::sleep(Duration::from_secs(5)).await;
    core.shutdown(&token, maintenance).await;

    assert!(core.supervisor.is_empty());
    assert_eq!(
        transport.count(|call| *call == TransportCall::Retract(message)),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_catches_idle_sessions() {
    let (core, transport, config) = core();
    let token = CancellationToken::new();
    let maintenance = core.spawn_maintenance(&config, &token);

    let user = discord_fixtures::test_user_id();
    let DispatchOutcome::Paged(message) = core.dispatcher.handle(text(">help", user)).await else {
        panic!("help should open a paging session");
    };

    tokio::time::sleep(config.paging.inactivity_timeout() + config.paging.sweep_interval()).await;
    assert!(!core.supervisor.contains(&message));
    assert_eq!(transport.retractions(message), 1);

    core.shutdown(&token, maintenance).await;
}

#[test]
fn test_intents_cover_reactions_and_content() {
    use serenity::all::GatewayIntents;

    let intents = intents();
    assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
    assert!(intents.contains(GatewayIntents::GUILD_MESSAGE_REACTIONS));
    assert!(intents.contains(GatewayIntents::DIRECT_MESSAGE_REACTIONS));
}

#[test]
fn test_builtin_aliases_resolve() {
    let (core, _transport, _config) = core();
    let registry = core.dispatcher.registry();
    let tokens = vec!["SROLL".to_string(), "5".to_string()];

    let resolution = tokio_test::assert_ok!(registry.resolve(&tokens));
    assert_eq!(registry.qualified_name(resolution.id), Some("steveroll"));
    assert_eq!(resolution.remaining, ["5"]);
}
