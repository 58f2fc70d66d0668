//! Snake Sync Server
//!
//! Serves the shared snake game over WebSocket.
//! Configuration comes from the environment; see [`ServerConfig::from_env`].

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use snake_sync::{
    network::{GameServer, ServerConfig, SyncMode},
    GAME_HEIGHT, GAME_WIDTH, SNAKE_SIZE, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env()?;

    info!("Snake Sync Server v{}", VERSION);
    info!(
        "Grid: {}x{} px, {} px cells ({}x{})",
        GAME_WIDTH,
        GAME_HEIGHT,
        SNAKE_SIZE,
        config.game.bounds.columns(),
        config.game.bounds.rows()
    );
    match config.sync.mode {
        SyncMode::ClientFrames => info!("Mode: client frames"),
        SyncMode::ServerClock { interval } => info!("Mode: server clock ({:?})", interval),
    }

    let server = Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await?;

    info!("Server stopped");
    Ok(())
}
