use anyhow::Context;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let pool = DatabaseManager::connect(&config.database).await?;

    let result = DatabaseManager::migrate(&pool).await;
    DatabaseManager::close(&pool).await;
    result?;

    output_success(&output_format, "Migrations applied", None)
}
