use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use panel_core::{
    render::render_summary, ChannelTransport, InteractionController, LiveViewStore, RefreshLoop,
    REFRESH_INTERVAL,
};
use pm2_integration::{Pm2Cli, ProcessSupervisor};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;
mod discord;
mod signature;

use app_state::{AppState, ACK_DEADLINE};
use config::load_settings;
use discord::DiscordRest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_settings()?
        .validate()
        .context("invalid panel settings")?;

    let rest = Arc::new(DiscordRest::new(
        &config.discord_api_base,
        config.discord_token.clone(),
        config.application_id,
    ));
    let supervisor: Arc<dyn ProcessSupervisor> = Arc::new(Pm2Cli::new(config.pm2_bin.clone()));
    let channel: Arc<dyn ChannelTransport> = rest.clone();
    let store = Arc::new(LiveViewStore::new(channel, config.channel));

    let snapshot = match pm2_integration::snapshot(&supervisor).await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            warn!(%error, "initial process list unavailable; the next refresh will fill it in");
            Vec::new()
        }
    };
    match store
        .bind_channel(&render_summary(&snapshot, Utc::now()))
        .await
    {
        Ok(view) => info!(channel = %config.channel, message_id = %view.handle, "live view bound"),
        Err(error) => warn!(%error, "failed to bind live view; the refresh loop will retry"),
    }

    RefreshLoop::new(Arc::clone(&supervisor), Arc::clone(&store), REFRESH_INTERVAL).spawn();

    let state = AppState {
        controller: Arc::new(InteractionController::new(supervisor, config.channel)),
        rest,
        public_key: config.public_key,
        ack_deadline: ACK_DEADLINE,
    };
    let app = api::build_router(Arc::new(state));

    info!(addr = %config.bind, "interactions endpoint listening");
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    axum::serve(listener, app).await?;
    Ok(())
}
