//! Startup wiring and main loop.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use gamewire_domain::{anonymize_user_id, BotId};
use gamewire_observer::{GameEvent, GameState};
use gamewire_relay::{ConnectionSupervisor, RelayOptions, TopicRouter};

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayOptions::default()
        .resolve()
        .context("broker configuration is incomplete")?;

    let user_id =
        std::env::var("GAMEWIRE_USER_ID").context("GAMEWIRE_USER_ID must identify this bot")?;
    let bot = BotId::new(anonymize_user_id(&user_id));
    let turn_by_turn = std::env::var("GAMEWIRE_TURN_UPDATES")
        .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    tracing::info!(bot = %bot, host = %config.host, port = config.port, "starting relay worker");

    let supervisor = ConnectionSupervisor::connect(&config)
        .await
        .context("failed to establish broker sessions")?;
    supervisor.ping().await.context("broker ping failed")?;

    let router = TopicRouter::new(supervisor.publisher(), supervisor.subscriber());
    let state = GameState::subscribe(&router, &bot, turn_by_turn)
        .await
        .context("failed to subscribe to bot channels")?;

    let mut events = state.events();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                GameEvent::GameStart { replay_id } => {
                    tracing::info!(replay_id = %replay_id, "game started");
                }
                GameEvent::Ended { won } => {
                    tracing::info!(won, "game ended");
                }
                GameEvent::Phase(phase) => {
                    tracing::info!(phase = ?phase, "phase changed");
                }
                GameEvent::Update(_) => {}
                other => {
                    tracing::info!(event = ?other, "lifecycle event");
                }
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    event_log.abort();
    supervisor.shutdown().await.context("broker shutdown failed")?;
    Ok(())
}
