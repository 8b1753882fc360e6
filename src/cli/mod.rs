pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "workout-tracker")]
#[command(about = "Workout tracker - API server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve(commands::serve::ServeArgs),

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Insert shared template exercises from a YAML fixture")]
    Seed(commands::seed::SeedArgs),

    #[command(about = "Mint a session token for development")]
    Token(commands::token::TokenArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve(args) => commands::serve::handle(args).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Seed(args) => commands::seed::handle(args, output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_in_memory() {
        let cli = Cli::try_parse_from(["workout-tracker", "serve", "--in-memory"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert!(args.in_memory),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["workout-tracker", "migrate", "--json"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
    }

    #[test]
    fn token_requires_email() {
        assert!(Cli::try_parse_from(["workout-tracker", "token"]).is_err());
    }
}
