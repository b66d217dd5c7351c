//! `academy config` - inspect the effective configuration

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use academy_core::config::CONFIG_ENV;
use academy_core::AcademyConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective config as TOML (secrets masked)
    Show,
    /// Show the config file path that would be read
    Path,
}

pub fn run_config(args: ConfigArgs, explicit: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => run_show(explicit),
        ConfigCommands::Path => run_path(explicit),
    }
}

fn run_show(explicit: Option<&Path>) -> Result<()> {
    let config = AcademyConfig::load(explicit).context("Failed to load academy config")?;
    println!("{}", config.redacted().to_toml()?);
    Ok(())
}

fn run_path(explicit: Option<&Path>) -> Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(Into::into))
        .unwrap_or_else(AcademyConfig::config_path);
    println!("{}", path.display());
    Ok(())
}
