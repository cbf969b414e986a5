//! Cell arena - authoritative game server.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Cell Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Border: {}x{}", config.border.width, config.border.height);
    info!(
        "  Tick: {}ms, broadcast: {}ms, max players: {}",
        config.server.tick_interval_ms, config.server.broadcast_interval_ms, config.server.max_players
    );
    info!("  Bots: {}, food: {}", config.bots.count, config.food.count);

    // Start the game server
    server::run(config).await?;

    Ok(())
}
