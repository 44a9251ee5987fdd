
mod communication_channel;
mod completion;
mod config;
mod conversation_manager;
mod discord_manager;
mod error;
mod history;
mod reply_generator;
mod transcript;


use std::sync::Arc;

use dotenvy::dotenv;
use serenity::client::Client;
use serenity::http::Http;
use serenity::prelude::GatewayIntents;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::completion::OpenAiCompletion;
use crate::config::RelayConfig;
use crate::conversation_manager::ConversationManager;
use crate::discord_manager::{DiscordChannel, Handler};
use crate::transcript::TranscriptLogger;


#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env();
    if config.openai_api_key.is_empty() || config.discord_token.is_empty() {
        warn!("OPENAI_API_KEY or DISCORD_TOKEN is empty; requests will fail to authenticate");
    }

    let completion = Arc::new(OpenAiCompletion::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
    ));
    let transcript = Arc::new(TranscriptLogger::new(config.log_dir.clone()));
    let channel = Arc::new(DiscordChannel::new(Arc::new(Http::new(&config.discord_token))));

    let manager = ConversationManager::new(&config, completion, transcript, channel);
    let _sweeper = manager.spawn_idle_sweeper(config.idle_ttl);

    let intents = GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Handler::new(manager))
        .await?;

    info!(model = %config.model, quiet_period = ?config.quiet_period, "starting relay");
    client.start().await?;
    Ok(())
}
