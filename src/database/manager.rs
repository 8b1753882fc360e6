use once_cell::sync::Lazy;
use sqlx::migrate::Migrator;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub static MIGRATOR: Lazy<Migrator> = Lazy::new(|| sqlx::migrate!("./migrations"));

/// Connection pool lifecycle: created once at startup, handed to the store,
/// closed on shutdown.
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Created database pool (max_connections={})",
            config.max_connections
        );
        Ok(pool)
    }

    /// Apply pending migrations from `./migrations`.
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        MIGRATOR.run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    pub async fn close(pool: &PgPool) {
        pool.close().await;
        info!("Closed database pool");
    }
}
