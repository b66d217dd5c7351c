//! `academy serve` - run the HTTP API

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;

use academy_core::AcademyConfig;
use academy_server::db::{create_pool_with_options, migrations};
use academy_server::http::{run_server, AppState, ServerConfig};

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides [server].bind)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Apply migrations before accepting requests
    #[arg(long)]
    pub migrate: bool,
}

pub async fn run_serve(args: ServeArgs, mut config: AcademyConfig) -> Result<()> {
    if let Some(url) = args.database_url {
        config.database.url = Some(url);
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.server.cors_permissive |= args.cors_permissive;

    let pool = create_pool_with_options(config.database_url()?, config.database.max_connections)
        .await
        .context("Failed to create database pool")?;

    if args.migrate {
        migrations::run(&pool).await.context("Failed to run migrations")?;
    }

    let server_config = ServerConfig::from(&config);
    tracing::info!(bind = %server_config.bind_addr, "starting academy server");

    let state = AppState::new(pool, config).context("Invalid server configuration")?;
    run_server(state, server_config).await.context("Server error")?;
    Ok(())
}
