use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgStore, WorkoutStore};
use crate::domain::ExerciseInput;
use crate::services::seed_templates;

const BUILTIN_TEMPLATES: &str = include_str!("../../../fixtures/template_exercises.yaml");

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[arg(long, help = "YAML fixture (defaults to the bundled template list)")]
    pub file: Option<PathBuf>,
}

pub fn parse_templates(yaml: &str) -> anyhow::Result<Vec<ExerciseInput>> {
    serde_yaml::from_str(yaml).context("invalid template fixture")
}

pub fn builtin_templates() -> anyhow::Result<Vec<ExerciseInput>> {
    parse_templates(BUILTIN_TEMPLATES)
}

pub async fn handle(args: SeedArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let templates = match &args.file {
        Some(path) => {
            let yaml = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_templates(&yaml)?
        }
        None => builtin_templates()?,
    };

    let config = AppConfig::from_env().context("invalid configuration")?;
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    let store = PgStore::new(pool);

    let inserted = seed_templates(&store, &templates).await;
    store.close().await;
    let inserted = inserted?;

    output_success(
        &output_format,
        &format!("Seeded {} of {} template exercises", inserted, templates.len()),
        Some(json!({ "inserted": inserted, "total": templates.len() })),
    )
}
