//! `academy migrate` - apply the schema

use anyhow::{Context, Result};
use clap::Parser;

use academy_core::AcademyConfig;
use academy_server::db::{create_pool, migrations};

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config: AcademyConfig) -> Result<()> {
    let url = match args.database_url {
        Some(url) => url,
        None => config.database_url()?.to_string(),
    };

    let pool = create_pool(&url).await.context("Failed to connect to database")?;
    migrations::run(&pool).await.context("Migration failed")?;
    println!("Schema is up to date");
    Ok(())
}
