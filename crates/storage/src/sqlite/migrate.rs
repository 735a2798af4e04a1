use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs versioned migrations for the quiz schema.
///
/// Version 1 creates the catalog, profiles, questions with their options,
/// attempts and responses.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS topics (
                    name TEXT PRIMARY KEY,
                    description TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS difficulty_levels (
                    name TEXT PRIMARY KEY,
                    level_order INTEGER NOT NULL CHECK (level_order >= 0),
                    description TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS profiles (
                    id TEXT PRIMARY KEY,
                    display_name TEXT NOT NULL,
                    level INTEGER NOT NULL CHECK (level >= 1),
                    xp_points INTEGER NOT NULL CHECK (xp_points >= 0),
                    streak_days INTEGER NOT NULL CHECK (streak_days >= 0),
                    last_activity TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id TEXT PRIMARY KEY,
                    topic TEXT NOT NULL,
                    difficulty TEXT NOT NULL,
                    question_text TEXT NOT NULL,
                    code_snippet TEXT,
                    explanation TEXT,
                    points INTEGER,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (topic) REFERENCES topics(name) ON DELETE CASCADE,
                    FOREIGN KEY (difficulty) REFERENCES difficulty_levels(name) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answer_options (
                    question_id TEXT NOT NULL,
                    option_order INTEGER NOT NULL CHECK (option_order >= 1),
                    option_text TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    PRIMARY KEY (question_id, option_order),
                    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_attempts (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    topic TEXT NOT NULL,
                    difficulty TEXT NOT NULL,
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    correct_answers INTEGER NOT NULL DEFAULT 0 CHECK (correct_answers >= 0),
                    score_percentage INTEGER CHECK (score_percentage BETWEEN 0 AND 100),
                    time_taken_seconds INTEGER CHECK (time_taken_seconds >= 0),
                    started_at TEXT NOT NULL,
                    completed_at TEXT,
                    FOREIGN KEY (user_id) REFERENCES profiles(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_responses (
                    id INTEGER PRIMARY KEY,
                    attempt_id TEXT NOT NULL,
                    question_id TEXT NOT NULL,
                    selected_option INTEGER CHECK (selected_option >= 0),
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    time_taken_seconds INTEGER NOT NULL CHECK (time_taken_seconds >= 0),
                    answered_at TEXT NOT NULL,
                    FOREIGN KEY (attempt_id) REFERENCES quiz_attempts(id) ON DELETE CASCADE,
                    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_topic_difficulty_created
                    ON questions (topic, difficulty, created_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quiz_attempts_user_started
                    ON quiz_attempts (user_id, started_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_user_responses_attempt
                    ON user_responses (attempt_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(1_i64)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        log::info!("applied schema migration 1");
    }

    Ok(())
}
