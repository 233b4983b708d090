use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: per-sublevel progress, skill tallies,
/// per-language stats, the generated content cache, and app settings.
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

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sublevel_progress (
                    language TEXT NOT NULL,
                    level_id TEXT NOT NULL,
                    sublevel_id TEXT NOT NULL,
                    completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
                    best_score INTEGER NOT NULL CHECK (best_score BETWEEN 0 AND 100),
                    attempts INTEGER NOT NULL CHECK (attempts >= 0),
                    last_attempt TEXT NOT NULL,
                    PRIMARY KEY (language, level_id, sublevel_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS skill_progress (
                    language TEXT NOT NULL,
                    skill TEXT NOT NULL,
                    attempts INTEGER NOT NULL CHECK (attempts >= 0),
                    accuracy_total INTEGER NOT NULL CHECK (accuracy_total >= 0),
                    PRIMARY KEY (language, skill)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS language_stats (
                    language TEXT PRIMARY KEY,
                    xp INTEGER NOT NULL CHECK (xp >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS content_cache (
                    language TEXT NOT NULL,
                    sublevel_id TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    generated_at TEXT NOT NULL,
                    PRIMARY KEY (language, sublevel_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS app_settings (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    selected_language TEXT,
                    theme TEXT NOT NULL DEFAULT 'light',
                    ai_api_key TEXT,
                    ai_model TEXT,
                    ai_base_url TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sublevel_progress_language_level
                    ON sublevel_progress (language, level_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
