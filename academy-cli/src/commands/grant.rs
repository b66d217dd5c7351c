//! `academy grant` - set a user's role directly in the database
//!
//! Bootstraps the first admin; later changes go through
//! `PATCH /admin/users/{id}/role`.

use anyhow::{Context, Result};
use clap::Parser;
use uuid::Uuid;

use academy_core::{AcademyConfig, Role};
use academy_server::db::{create_pool, UserRepo};

#[derive(Parser, Debug)]
pub struct GrantArgs {
    /// User id (the token subject)
    pub user_id: Uuid,

    /// student, instructor or admin
    #[arg(long, short = 'r')]
    pub role: Role,
}

pub async fn run_grant(args: GrantArgs, config: AcademyConfig) -> Result<()> {
    let pool = create_pool(config.database_url()?)
        .await
        .context("Failed to connect to database")?;
    let user = UserRepo::new(&pool)
        .set_role(args.user_id, args.role)
        .await
        .context(format!("Failed to update user {}", args.user_id))?;
    println!("{} is now {}", user.email, user.role);
    Ok(())
}
