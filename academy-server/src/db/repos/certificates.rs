//! Certificate repository
//!
//! At most one certificate per user and course: the insert uses
//! ON CONFLICT DO NOTHING and a repeat issuance returns the existing row.

use academy_core::{certificate_number, CertificateCheck, CourseProgress};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::gamification::quiz_pass_counts;
use super::DbError;

/// Attempts at drawing an unused certificate number before giving up
const NUMBER_RETRIES: usize = 3;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub certificate_number: String,
    pub issued_at: DateTime<Utc>,
}

/// Public view used by the verification endpoint
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VerifiedCertificate {
    pub certificate_number: String,
    pub issued_at: DateTime<Utc>,
    pub course_title: String,
    pub course_slug: String,
    pub holder_name: Option<String>,
}

/// Certificate listing entry for the holder
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HeldCertificate {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub certificate: Certificate,
    pub course_title: String,
}

pub struct CertificateRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CertificateRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn for_user(&self, user_id: Uuid) -> Result<Vec<HeldCertificate>, DbError> {
        Ok(sqlx::query_as::<_, HeldCertificate>(
            r#"
            SELECT ce.id, ce.user_id, ce.course_id, ce.certificate_number, ce.issued_at,
                   c.title AS course_title
            FROM certificates ce
            JOIN courses c ON c.id = ce.course_id
            WHERE ce.user_id = $1
            ORDER BY ce.issued_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn for_course(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<Certificate>, DbError> {
        find(self.pool, user_id, course_id).await
    }

    pub async fn verify(&self, number: &str) -> Result<VerifiedCertificate, DbError> {
        sqlx::query_as::<_, VerifiedCertificate>(
            r#"
            SELECT ce.certificate_number, ce.issued_at,
                   c.title AS course_title, c.slug AS course_slug,
                   u.display_name AS holder_name
            FROM certificates ce
            JOIN courses c ON c.id = ce.course_id
            JOIN users u ON u.id = ce.user_id
            WHERE ce.certificate_number = $1
            "#,
        )
        .bind(number)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("certificate", number))
    }
}

async fn find<'c, E: PgExecutor<'c>>(
    exec: E,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<Option<Certificate>, DbError> {
    Ok(sqlx::query_as::<_, Certificate>(
        r#"
        SELECT id, user_id, course_id, certificate_number, issued_at
        FROM certificates
        WHERE user_id = $1 AND course_id = $2
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(exec)
    .await?)
}

/// Issue the course certificate when the rules allow it.
///
/// Returns the certificate (new or existing) and whether this call issued it.
pub(crate) async fn issue_if_eligible(
    conn: &mut PgConnection,
    user_id: Uuid,
    course_id: Uuid,
    progress: CourseProgress,
    now: DateTime<Utc>,
) -> Result<Option<(Certificate, bool)>, DbError> {
    if let Some(existing) = find(&mut *conn, user_id, course_id).await? {
        return Ok(Some((existing, false)));
    }

    let (quiz_lessons, quizzes_passed) = quiz_pass_counts(&mut *conn, user_id, course_id).await?;
    let check = CertificateCheck {
        progress,
        quiz_lessons,
        quizzes_passed,
    };
    if !check.is_eligible() {
        return Ok(None);
    }

    for _ in 0..NUMBER_RETRIES {
        let number = certificate_number(now.date_naive(), &mut rand::thread_rng());
        let inserted = sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (user_id, course_id, certificate_number, issued_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            RETURNING id, user_id, course_id, certificate_number, issued_at
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(&number)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(certificate) = inserted {
            tracing::info!(
                user_id = %user_id,
                course_id = %course_id,
                number = %certificate.certificate_number,
                "certificate issued"
            );
            return Ok(Some((certificate, true)));
        }

        // Conflict on (user, course) means another request won the race
        if let Some(existing) = find(&mut *conn, user_id, course_id).await? {
            return Ok(Some((existing, false)));
        }
        tracing::warn!(number = %number, "certificate number collision, retrying");
    }

    Err(DbError::Conflict {
        resource: "certificate",
        reason: "could not allocate a unique certificate number".to_string(),
    })
}
