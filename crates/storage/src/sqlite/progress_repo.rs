use lingua_core::model::{
    LanguageCode, LanguageProgress, LevelId, SkillStats, SublevelId, SublevelProgress,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    i64_to_u32, i64_to_u64, level_id_from_str, score_from_i64, ser, sublevel_id_from_str,
};
use crate::repository::{ProgressRepository, SkillRecord, StorageError, SublevelRecord};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_language(
        &self,
        language: &LanguageCode,
    ) -> Result<LanguageProgress, StorageError> {
        let mut progress = LanguageProgress::new();

        let rows = sqlx::query(
            r"
            SELECT level_id, sublevel_id, completed, best_score, attempts, last_attempt
            FROM sublevel_progress
            WHERE language = ?1
            ",
        )
        .bind(language.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        for row in rows {
            let (level_id, sublevel_id, record) = sublevel_from_row(&row)?;
            progress.restore_sublevel(level_id, sublevel_id, record);
        }

        let rows = sqlx::query(
            r"
            SELECT skill, attempts, accuracy_total
            FROM skill_progress
            WHERE language = ?1
            ",
        )
        .bind(language.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        for row in rows {
            let skill: String = row.try_get("skill").map_err(ser)?;
            let attempts = i64_to_u32("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?;
            let accuracy_total = i64_to_u64(
                "accuracy_total",
                row.try_get::<i64, _>("accuracy_total").map_err(ser)?,
            )?;
            progress.restore_skill(skill, SkillStats::from_persisted(attempts, accuracy_total));
        }

        let row = sqlx::query("SELECT xp FROM language_stats WHERE language = ?1")
            .bind(language.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if let Some(row) = row {
            let xp = i64_to_u64("xp", row.try_get::<i64, _>("xp").map_err(ser)?)?;
            progress.restore_xp(xp);
        }

        Ok(progress)
    }

    async fn upsert_sublevel(
        &self,
        language: &LanguageCode,
        record: &SublevelRecord,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO sublevel_progress (language, level_id, sublevel_id, completed, best_score, attempts, last_attempt)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(language, level_id, sublevel_id) DO UPDATE SET
                completed = excluded.completed,
                best_score = excluded.best_score,
                attempts = excluded.attempts,
                last_attempt = excluded.last_attempt
            ",
        )
        .bind(language.as_str())
        .bind(record.level_id.as_str())
        .bind(record.sublevel_id.as_str())
        .bind(i64::from(record.completed))
        .bind(i64::from(record.best_score))
        .bind(i64::from(record.attempts))
        .bind(record.last_attempt)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn upsert_skill(
        &self,
        language: &LanguageCode,
        record: &SkillRecord,
    ) -> Result<(), StorageError> {
        let accuracy_total = i64::try_from(record.accuracy_total)
            .map_err(|_| StorageError::Serialization("accuracy_total overflow".into()))?;

        sqlx::query(
            r"
            INSERT INTO skill_progress (language, skill, attempts, accuracy_total)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(language, skill) DO UPDATE SET
                attempts = excluded.attempts,
                accuracy_total = excluded.accuracy_total
            ",
        )
        .bind(language.as_str())
        .bind(record.skill.as_str())
        .bind(i64::from(record.attempts))
        .bind(accuracy_total)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn set_xp(&self, language: &LanguageCode, xp: u64) -> Result<(), StorageError> {
        let xp = i64::try_from(xp)
            .map_err(|_| StorageError::Serialization("xp overflow".into()))?;

        sqlx::query(
            r"
            INSERT INTO language_stats (language, xp)
            VALUES (?1, ?2)
            ON CONFLICT(language) DO UPDATE SET
                xp = excluded.xp
            ",
        )
        .bind(language.as_str())
        .bind(xp)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn clear_language(&self, language: &LanguageCode) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for statement in [
            "DELETE FROM sublevel_progress WHERE language = ?1",
            "DELETE FROM skill_progress WHERE language = ?1",
            "DELETE FROM language_stats WHERE language = ?1",
        ] {
            sqlx::query(statement)
                .bind(language.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

fn sublevel_from_row(
    row: &SqliteRow,
) -> Result<(LevelId, SublevelId, SublevelProgress), StorageError> {
    let level_id = level_id_from_str(row.try_get::<String, _>("level_id").map_err(ser)?.as_str())?;
    let sublevel_id =
        sublevel_id_from_str(row.try_get::<String, _>("sublevel_id").map_err(ser)?.as_str())?;
    let completed = row.try_get::<i64, _>("completed").map_err(ser)? != 0;
    let best_score = score_from_i64(row.try_get::<i64, _>("best_score").map_err(ser)?)?;
    let attempts = i64_to_u32("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?;
    let last_attempt = row.try_get("last_attempt").map_err(ser)?;

    Ok((
        level_id,
        sublevel_id,
        SublevelProgress::from_persisted(completed, best_score, attempts, last_attempt),
    ))
}
