//! Narde multiplayer match server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod actor;
mod collaborators;
mod config;
mod protocol;
mod room;
mod server;

use collaborators::Collaborators;
use config::ServerConfig;
use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!(
        "Starting Narde server (reconnect grace {:?}, auto end turn {:?})",
        config.timings.reconnect_grace, config.timings.auto_end_turn
    );

    let state = Arc::new(ServerState::new(
        Collaborators::in_memory(),
        config.timings,
    ));

    server::run_server(config.addr, state).await
}
