//! Schema migrations
//!
//! Every statement is idempotent so `run` is safe on each startup.

use sqlx::PgPool;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        display_name TEXT,
        role TEXT NOT NULL DEFAULT 'student'
            CHECK (role IN ('student', 'instructor', 'admin')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS courses (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        slug TEXT NOT NULL UNIQUE CHECK (slug ~ '^[a-z0-9][a-z0-9-]{0,79}$'),
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        instructor_id UUID REFERENCES users(id) ON DELETE SET NULL,
        published BOOLEAN NOT NULL DEFAULT FALSE,
        sequential BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS course_modules (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        course_id UUID NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        position INT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (course_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lessons (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        module_id UUID NOT NULL REFERENCES course_modules(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        position INT NOT NULL,
        is_preview BOOLEAN NOT NULL DEFAULT FALSE,
        passing_score INT NOT NULL DEFAULT 70 CHECK (passing_score BETWEEN 0 AND 100),
        max_attempts INT CHECK (max_attempts IS NULL OR max_attempts > 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (module_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quiz_questions (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        lesson_id UUID NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
        prompt TEXT NOT NULL,
        position INT NOT NULL,
        points INT NOT NULL DEFAULT 1 CHECK (points > 0),
        kind JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (lesson_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS course_enrollments (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course_id UUID NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        progress_percent INT NOT NULL DEFAULT 0 CHECK (progress_percent BETWEEN 0 AND 100),
        enrolled_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        completed_at TIMESTAMPTZ,
        UNIQUE (user_id, course_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_progress (
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        lesson_id UUID NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
        course_id UUID NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        completed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (user_id, lesson_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quiz_attempts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        lesson_id UUID NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
        score INT NOT NULL CHECK (score BETWEEN 0 AND 100),
        passed BOOLEAN NOT NULL,
        perfect BOOLEAN NOT NULL DEFAULT FALSE,
        answers JSONB NOT NULL,
        submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS certificates (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course_id UUID NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        certificate_number TEXT NOT NULL UNIQUE,
        issued_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, course_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS xp_events (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        amount INT NOT NULL CHECK (amount > 0),
        source TEXT NOT NULL,
        source_id UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, source, source_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_gamification_stats (
        user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        total_xp BIGINT NOT NULL DEFAULT 0 CHECK (total_xp >= 0),
        level INT NOT NULL DEFAULT 1,
        current_streak INT NOT NULL DEFAULT 0,
        longest_streak INT NOT NULL DEFAULT 0,
        last_activity_date DATE,
        lessons_completed INT NOT NULL DEFAULT 0,
        courses_completed INT NOT NULL DEFAULT 0,
        perfect_quizzes INT NOT NULL DEFAULT 0,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_badges (
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        badge TEXT NOT NULL,
        awarded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (user_id, badge)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS learning_paths (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        slug TEXT NOT NULL UNIQUE CHECK (slug ~ '^[a-z0-9][a-z0-9-]{0,79}$'),
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        published BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS learning_path_courses (
        path_id UUID NOT NULL REFERENCES learning_paths(id) ON DELETE CASCADE,
        course_id UUID NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        position INT NOT NULL,
        PRIMARY KEY (path_id, course_id),
        UNIQUE (path_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS learning_path_enrollments (
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        path_id UUID NOT NULL REFERENCES learning_paths(id) ON DELETE CASCADE,
        enrolled_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        completed_at TIMESTAMPTZ,
        PRIMARY KEY (user_id, path_id)
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_courses_published ON courses(published, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_courses_instructor ON courses(instructor_id)",
    "CREATE INDEX IF NOT EXISTS idx_lessons_module ON lessons(module_id, position)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_course ON course_enrollments(course_id)",
    "CREATE INDEX IF NOT EXISTS idx_progress_user_course ON user_progress(user_id, course_id)",
    "CREATE INDEX IF NOT EXISTS idx_attempts_user_lesson ON quiz_attempts(user_id, lesson_id, submitted_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_xp_events_user ON xp_events(user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_stats_total_xp ON user_gamification_stats(total_xp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_path_courses_course ON learning_path_courses(course_id)",
];

/// Run all migrations
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running academy migrations...");

    let mut tx = pool.begin().await?;
    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(
        tables = TABLES.len(),
        indexes = INDEXES.len(),
        "Academy migrations complete"
    );
    Ok(())
}
