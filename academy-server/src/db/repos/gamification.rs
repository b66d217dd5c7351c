//! XP ledger, gamification stats and badges
//!
//! `xp_events` is append-only with UNIQUE(user_id, source, source_id), so a
//! payout can never happen twice for the same lesson, quiz, course or path.
//! `user_gamification_stats` is a running summary updated in the same
//! transaction as the ledger insert.

use std::collections::BTreeSet;

use academy_core::{new_badges, Badge, StatsSnapshot, Streak, XpRules, XpSource};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use super::{count_u32, DbError};
use crate::models::{Paginated, Pagination};

#[derive(Debug, Clone, FromRow, Default)]
pub struct StatsRow {
    pub user_id: Uuid,
    pub total_xp: i64,
    pub level: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_date: Option<NaiveDate>,
    pub lessons_completed: i32,
    pub courses_completed: i32,
    pub perfect_quizzes: i32,
}

impl StatsRow {
    pub fn total_xp(&self) -> u64 {
        self.total_xp.max(0) as u64
    }

    pub fn streak(&self) -> Streak {
        Streak {
            current: self.current_streak.max(0) as u32,
            longest: self.longest_streak.max(0) as u32,
            last_activity: self.last_activity_date,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lessons_completed: self.lessons_completed.max(0) as u32,
            courses_completed: self.courses_completed.max(0) as u32,
            perfect_quizzes: self.perfect_quizzes.max(0) as u32,
            longest_streak: self.longest_streak.max(0) as u32,
            level: self.level.max(1) as u32,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct XpEvent {
    pub id: Uuid,
    pub amount: i32,
    pub source: String,
    pub source_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub total_xp: i64,
    pub level: i32,
}

/// Counter increments applied alongside an XP payout
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsDelta {
    pub xp: u32,
    pub lessons: u32,
    pub courses: u32,
    pub perfect_quizzes: u32,
}

/// Stats after an update, with what changed
#[derive(Debug, Clone)]
pub struct StatsUpdate {
    pub stats: StatsRow,
    pub leveled_up: Option<u32>,
}

const STATS_COLUMNS: &str = "user_id, total_xp, level, current_streak, longest_streak, \
    last_activity_date, lessons_completed, courses_completed, perfect_quizzes";

pub struct GamificationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GamificationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Stats for a user; a user with no activity gets zeroed stats at level 1.
    pub async fn stats(&self, user_id: Uuid) -> Result<StatsRow, DbError> {
        load_stats(self.pool, user_id).await
    }

    pub async fn badges(&self, user_id: Uuid) -> Result<BTreeSet<Badge>, DbError> {
        held_badges(self.pool, user_id).await
    }

    pub async fn xp_events(&self, user_id: Uuid, page: Pagination) -> Result<Paginated<XpEvent>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, amount, source, source_id, created_at
            FROM xp_events
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM xp_events WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        let items = rows
            .iter()
            .map(|r| {
                Ok(XpEvent {
                    id: r.try_get("id")?,
                    amount: r.try_get("amount")?,
                    source: r.try_get("source")?,
                    source_id: r.try_get("source_id")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(page.wrap(items, total))
    }

    pub async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT
                RANK() OVER (ORDER BY s.total_xp DESC) AS rank,
                s.user_id, u.display_name, s.total_xp, s.level
            FROM user_gamification_stats s
            JOIN users u ON u.id = s.user_id
            WHERE s.total_xp > 0
            ORDER BY s.total_xp DESC, s.user_id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(LeaderboardEntry {
                    rank: r.try_get("rank")?,
                    user_id: r.try_get("user_id")?,
                    display_name: r.try_get("display_name")?,
                    total_xp: r.try_get("total_xp")?,
                    level: r.try_get("level")?,
                })
            })
            .collect()
    }
}

pub(crate) async fn load_stats<'c, E: PgExecutor<'c>>(exec: E, user_id: Uuid) -> Result<StatsRow, DbError> {
    let sql = format!("SELECT {STATS_COLUMNS} FROM user_gamification_stats WHERE user_id = $1");
    let row = sqlx::query_as::<_, StatsRow>(&sql)
        .bind(user_id)
        .fetch_optional(exec)
        .await?;

    Ok(row.unwrap_or(StatsRow {
        user_id,
        level: 1,
        ..StatsRow::default()
    }))
}

/// Insert one ledger row. Returns the XP actually paid: 0 when this
/// (source, source_id) already paid out or the rule pays nothing.
pub(crate) async fn award_xp<'c, E: PgExecutor<'c>>(
    exec: E,
    user_id: Uuid,
    source: XpSource,
    source_id: Uuid,
    rules: &XpRules,
) -> Result<u32, DbError> {
    let amount = rules.amount(source);
    if amount == 0 {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO xp_events (user_id, amount, source, source_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, source, source_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(amount as i32)
    .bind(source.as_str())
    .bind(source_id)
    .execute(exec)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(0);
    }

    tracing::debug!(user_id = %user_id, %source, amount, "xp awarded");
    Ok(amount)
}

/// Fold XP and counters into the stats row and record today's activity.
pub(crate) async fn apply_activity(
    conn: &mut PgConnection,
    user_id: Uuid,
    delta: StatsDelta,
    today: NaiveDate,
    rules: &XpRules,
) -> Result<StatsUpdate, DbError> {
    sqlx::query("INSERT INTO user_gamification_stats (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let sql = format!("SELECT {STATS_COLUMNS} FROM user_gamification_stats WHERE user_id = $1 FOR UPDATE");
    let current = sqlx::query_as::<_, StatsRow>(&sql)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    let before_xp = current.total_xp();
    let total_xp = before_xp.saturating_add(delta.xp as u64);
    let level = rules.level_for_xp(total_xp);
    let streak = current.streak().record_activity(today);

    let sql = format!(
        r#"
        UPDATE user_gamification_stats SET
            total_xp = $2,
            level = $3,
            current_streak = $4,
            longest_streak = $5,
            last_activity_date = $6,
            lessons_completed = lessons_completed + $7,
            courses_completed = courses_completed + $8,
            perfect_quizzes = perfect_quizzes + $9,
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING {STATS_COLUMNS}
        "#
    );
    let stats = sqlx::query_as::<_, StatsRow>(&sql)
        .bind(user_id)
        .bind(total_xp as i64)
        .bind(level as i32)
        .bind(streak.current as i32)
        .bind(streak.longest as i32)
        .bind(streak.last_activity)
        .bind(delta.lessons as i32)
        .bind(delta.courses as i32)
        .bind(delta.perfect_quizzes as i32)
        .fetch_one(&mut *conn)
        .await?;

    let leveled_up = rules.level_up(before_xp, total_xp);
    if let Some(level) = leveled_up {
        tracing::info!(user_id = %user_id, level, "level up");
    }

    Ok(StatsUpdate {
        stats,
        leveled_up,
    })
}

/// Insert badges the stats now imply; returns only the new ones.
pub(crate) async fn award_badges(
    conn: &mut PgConnection,
    user_id: Uuid,
    stats: &StatsRow,
) -> Result<Vec<Badge>, DbError> {
    let held = held_badges(&mut *conn, user_id).await?;
    let fresh = new_badges(&stats.snapshot(), &held);

    for badge in &fresh {
        sqlx::query("INSERT INTO user_badges (user_id, badge) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(badge.as_str())
            .execute(&mut *conn)
            .await?;
        tracing::info!(user_id = %user_id, %badge, "badge awarded");
    }

    Ok(fresh)
}

async fn held_badges<'c, E: PgExecutor<'c>>(exec: E, user_id: Uuid) -> Result<BTreeSet<Badge>, DbError> {
    let rows = sqlx::query("SELECT badge FROM user_badges WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(exec)
        .await?;

    let mut held = BTreeSet::new();
    for row in rows {
        let name: String = row.try_get("badge")?;
        match name.parse::<Badge>() {
            Ok(badge) => {
                held.insert(badge);
            }
            // Retired badge names stay in the table but are not reported
            Err(_) => tracing::warn!(user_id = %user_id, badge = %name, "unknown badge in table"),
        }
    }
    Ok(held)
}

/// Number of lessons with a quiz in the course, and how many of those the
/// user has passed.
pub(crate) async fn quiz_pass_counts<'c, E: PgExecutor<'c>>(
    exec: E,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<(u32, u32), DbError> {
    let row = sqlx::query(
        r#"
        WITH quiz_lessons AS (
            SELECT DISTINCT q.lesson_id
            FROM quiz_questions q
            JOIN lessons l ON l.id = q.lesson_id
            JOIN course_modules m ON m.id = l.module_id
            WHERE m.course_id = $2
        )
        SELECT
            (SELECT COUNT(*) FROM quiz_lessons) AS quiz_lessons,
            (SELECT COUNT(DISTINCT a.lesson_id)
             FROM quiz_attempts a
             JOIN quiz_lessons ql ON ql.lesson_id = a.lesson_id
             WHERE a.user_id = $1 AND a.passed) AS quizzes_passed
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(exec)
    .await?;

    Ok((
        count_u32(row.try_get("quiz_lessons")?),
        count_u32(row.try_get("quizzes_passed")?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_snapshot_is_level_one() {
        let stats = StatsRow {
            level: 1,
            ..StatsRow::default()
        };
        let snap = stats.snapshot();
        assert_eq!(snap.level, 1);
        assert_eq!(snap.lessons_completed, 0);
        assert_eq!(stats.total_xp(), 0);
    }

    #[test]
    fn negative_counters_clamp() {
        let stats = StatsRow {
            total_xp: -5,
            current_streak: -1,
            ..StatsRow::default()
        };
        assert_eq!(stats.total_xp(), 0);
        assert_eq!(stats.streak().current, 0);
    }
}
