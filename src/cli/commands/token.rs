use anyhow::Context;
use clap::Args;
use uuid::Uuid;

use crate::auth::{Claims, SessionKeys};
use crate::cli::{utils::output_value, OutputFormat};
use crate::config::AppConfig;
use crate::database::models::UserProfile;
use crate::database::{DatabaseManager, PgStore, WorkoutStore};

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "Email of the user the token is for")]
    pub email: String,

    #[arg(long, help = "Sign for this id without touching the database")]
    pub user_id: Option<Uuid>,

    #[arg(long, help = "Display name stored when the user is created")]
    pub name: Option<String>,
}

/// With `--user-id` the token is only signed; otherwise the user is created
/// or updated by email first so the token resolves against the database.
pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let keys = SessionKeys::new(
        &config.security.session_secret,
        config.security.session_expiry_hours,
    );

    let token = match args.user_id {
        Some(user_id) => keys.sign(&Claims::new(
            user_id,
            args.email,
            args.name,
            keys.expiry_hours(),
        ))?,
        None => {
            let pool = DatabaseManager::connect(&config.database).await?;
            let store = PgStore::new(pool);
            let user = store
                .upsert_user(&UserProfile {
                    email: args.email,
                    name: args.name,
                    image: None,
                })
                .await;
            store.close().await;
            keys.issue(&user?)?
        }
    };

    output_value(&output_format, "token", &token)
}
