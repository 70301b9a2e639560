use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use abtracker::auth::{admins, events, session};
use abtracker::config::{Cli, Command, Config};
use abtracker::db;
use abtracker::routes;
use abtracker::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let purged = session::purge_expired(&pool)?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions", purged);
    }

    if let Some(Command::AddAdmin { email, password }) = &cli.command {
        let admin = admins::upsert_admin(&pool, email, password)
            .map_err(|e| anyhow::anyhow!("Could not save admin: {e}"))?;
        tracing::info!(admin_id = %admin.id, "Admin {} is ready", admin.email);
        return Ok(());
    }

    let state = AppState::new(pool, config.clone());
    tokio::spawn(events::log_auth_events(state.auth_events.subscribe()));

    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
