use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tokio::net::TcpListener;
use tracing::info;

use crate::auth::OAuthProvider;
use crate::cli::commands::seed::builtin_templates;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, MemoryStore, PgStore, WorkoutStore};
use crate::services::seed_templates;
use crate::state::AppState;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, help = "Keep all data in memory instead of PostgreSQL")]
    pub in_memory: bool,

    #[arg(long, help = "Port to listen on (overrides API_PORT)")]
    pub port: Option<u16>,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    info!("Starting workout tracker in {:?} mode", config.environment);

    let store: Arc<dyn WorkoutStore> = if args.in_memory {
        let store = MemoryStore::new();
        seed_templates(&store, &builtin_templates()?).await?;
        info!("Using in-memory store");
        Arc::new(store)
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let identity = Arc::new(OAuthProvider::new(config.oauth.clone()));
    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(config, store.clone(), identity);
    let app = crate::app(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Workout tracker listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
