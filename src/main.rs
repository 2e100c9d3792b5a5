//! Angel relay - anonymous angel/mortal message relay for Telegram
//!
//! Players send `/send`, pick their angel or mortal, and type a message;
//! the bot forwards it to that player's chat.

mod bot;
mod config;
mod directory;
mod runtime;
mod state_machine;
mod telegram;

use bot::Bot;
use config::BotConfig;
use directory::PlayerDirectory;
use runtime::{RelayManager, RuntimeConfig};
use std::sync::Arc;
use telegram::TelegramClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "angel_relay=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    // A malformed players file aborts startup
    tracing::info!(path = %config.players_path.display(), "Loading players");
    let directory = Arc::new(PlayerDirectory::load(&config.players_path)?);
    if directory.is_empty() {
        tracing::warn!("Players file has no players; every relay will be refused");
    }

    let client = Arc::new(TelegramClient::new(
        &config.token,
        &config.api_url,
        config.poll_timeout,
    )?);
    let manager = Arc::new(RelayManager::new(
        directory,
        Arc::clone(&client),
        RuntimeConfig {
            session_timeout: config.session_timeout,
            ..RuntimeConfig::default()
        },
    ));

    Bot::new(client, manager, config.poll_timeout)
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
        })
        .await;

    Ok(())
}
