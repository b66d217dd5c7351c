//! `academy token` - sign a development bearer token with the configured secret

use anyhow::{anyhow, Result};
use clap::Parser;
use uuid::Uuid;

use academy_core::AcademyConfig;
use academy_server::http::auth::{Claims, JwtKeys};

#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// Email claim
    #[arg(long)]
    pub email: String,

    /// Subject (user id); a random id when omitted
    #[arg(long)]
    pub user_id: Option<Uuid>,

    /// Display name claim
    #[arg(long)]
    pub name: Option<String>,

    /// Lifetime in seconds
    #[arg(long, default_value_t = 3600)]
    pub ttl: u64,

    /// Print the claims as JSON next to the token
    #[arg(long)]
    pub json: bool,
}

pub fn run_token(args: TokenArgs, config: &AcademyConfig) -> Result<()> {
    let keys = JwtKeys::new(config.jwt_secret()?, config.auth.leeway_seconds);
    let claims = Claims::new(
        args.user_id.unwrap_or_else(Uuid::new_v4),
        args.email,
        args.name,
        args.ttl,
    );
    let token = keys.sign(&claims).map_err(|e| anyhow!(e))?;

    if args.json {
        let out = serde_json::json!({ "token": token, "claims": claims });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", token);
    }
    Ok(())
}
