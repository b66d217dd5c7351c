//! User repository
//!
//! Accounts are created by the identity provider. The first authenticated
//! request upserts the local row; the stored role is authoritative.

use academy_core::Role;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::DbError;

/// User record from database
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PgRow> for User {
    type Error = DbError;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            role: role
                .parse()
                .map_err(|_| DbError::Corrupt(format!("users.role = '{}'", role)))?,
            created_at: row.try_get("created_at")?,
        })
    }
}

pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the user on first sight, refresh email and name afterwards.
    pub async fn ensure(
        &self,
        id: Uuid,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<User, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email,
                    display_name = COALESCE(EXCLUDED.display_name, users.display_name)
            RETURNING id, email, display_name, role, created_at
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(display_name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                DbError::Conflict {
                    resource: "user",
                    reason: format!("email '{}' belongs to another account", email),
                }
            } else {
                e.into()
            }
        })?;

        User::try_from(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, DbError> {
        let row = sqlx::query(
            "SELECT id, email, display_name, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))?;

        User::try_from(row)
    }

    pub async fn set_role(&self, id: Uuid, role: Role) -> Result<User, DbError> {
        let row = sqlx::query(
            r#"
            UPDATE users SET role = $2
            WHERE id = $1
            RETURNING id, email, display_name, role, created_at
            "#,
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))?;

        tracing::info!(user_id = %id, role = %role, "role changed");
        User::try_from(row)
    }
}
