//! academy CLI
//!
//! - `serve`: run the HTTP API
//! - `migrate`: apply the schema to the configured database
//! - `config`: show the effective configuration or its file path
//! - `token`: mint a bearer token for local development
//! - `grant`: set a user's role (bootstraps the first admin)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use academy_core::AcademyConfig;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "academy",
    author,
    version,
    about = "Online courses with quizzes, certificates and XP",
    long_about = "Serve the academy JSON API backed by PostgreSQL: courses, lesson progress, \
                  quizzes, certificates, XP, streaks, badges and learning paths."
)]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (needs the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    /// Config file (default: $ACADEMY_CONFIG or ~/.academy/config.toml)
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Create or update the database schema
    Migrate(commands::migrate::MigrateArgs),
    /// Inspect configuration (show, path)
    Config(commands::config::ConfigArgs),
    /// Mint a signed bearer token for local testing
    Token(commands::token::TokenArgs),
    /// Set a user's role directly in the database
    Grant(commands::grant::GrantArgs),
}

fn load_config(path: Option<&PathBuf>) -> Result<AcademyConfig> {
    AcademyConfig::load(path.map(PathBuf::as_path)).context("Failed to load academy config")
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let result = match cli.command {
        Commands::Serve(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::run_serve(args, config).await
        }
        Commands::Migrate(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::run_migrate(args, config).await
        }
        Commands::Config(args) => commands::run_config(args, cli.config.as_deref()),
        Commands::Token(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::run_token(args, &config)
        }
        Commands::Grant(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::run_grant(args, config).await
        }
    };

    tracing_setup::shutdown_otel();
    result
}
