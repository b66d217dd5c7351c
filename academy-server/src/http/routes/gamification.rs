//! XP, levels, streaks, badges and the leaderboard

use std::collections::BTreeSet;
use std::sync::Arc;

use academy_core::{local_date, Badge, LevelProgress};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repos::{GamificationRepo, LeaderboardEntry, XpEvent};
use crate::http::error::ApiError;
use crate::http::extractors::AuthUser;
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams};

const DEFAULT_LEADERBOARD: u32 = 10;
const MAX_LEADERBOARD: u32 = 100;

#[derive(Serialize)]
pub struct StatsResponse {
    pub user_id: Uuid,
    pub total_xp: u64,
    #[serde(flatten)]
    pub level: LevelProgress,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub lessons_completed: u32,
    pub courses_completed: u32,
    pub perfect_quizzes: u32,
    pub badges: BTreeSet<Badge>,
}

#[derive(Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<u32>,
}

/// GET /me/stats - XP, level progress, streaks and badges
async fn my_stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let repo = GamificationRepo::new(&state.pool);
    let stats = repo.stats(user.id()).await?;
    let badges = repo.badges(user.id()).await?;

    let rules = &state.config.gamification;
    let today = local_date(Utc::now(), rules.timezone);
    let snapshot = stats.snapshot();
    let streak = stats.streak();

    Ok(Json(StatsResponse {
        user_id: user.id(),
        total_xp: stats.total_xp(),
        level: rules.xp.level_progress(stats.total_xp()),
        current_streak: streak.current_on(today),
        longest_streak: streak.longest,
        last_activity_date: streak.last_activity,
        lessons_completed: snapshot.lessons_completed,
        courses_completed: snapshot.courses_completed,
        perfect_quizzes: snapshot.perfect_quizzes,
        badges,
    }))
}

/// GET /me/xp-events - XP history, newest first
async fn my_xp_events(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<XpEvent>>, ApiError> {
    let page = Pagination::from(params);
    let events = GamificationRepo::new(&state.pool).xp_events(user.id(), page).await?;
    Ok(Json(events))
}

/// GET /leaderboard - top users by XP
async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let entries = GamificationRepo::new(&state.pool)
        .leaderboard(leaderboard_limit(params.limit))
        .await?;
    Ok(Json(entries))
}

fn leaderboard_limit(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_LEADERBOARD).clamp(1, MAX_LEADERBOARD)
}

/// Gamification routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me/stats", get(my_stats))
        .route("/me/xp-events", get(my_xp_events))
        .route("/leaderboard", get(leaderboard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::test_support::{app, send};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    #[test]
    fn leaderboard_limit_is_clamped() {
        assert_eq!(leaderboard_limit(None), 10);
        assert_eq!(leaderboard_limit(Some(0)), 1);
        assert_eq!(leaderboard_limit(Some(500)), 100);
        assert_eq!(leaderboard_limit(Some(25)), 25);
    }

    #[tokio::test]
    async fn stats_require_token() {
        let request = Request::get("/me/stats").body(Body::empty()).unwrap();
        let (status, _) = send(app(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
