use chrono::{DateTime, Utc};
use lingua_core::model::{LanguageCode, Question, SublevelId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::ser;
use crate::repository::{ContentCacheRepository, StorageError};

#[async_trait::async_trait]
impl ContentCacheRepository for SqliteRepository {
    async fn get(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
    ) -> Result<Option<Vec<Question>>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT payload FROM content_cache
            WHERE language = ?1 AND sublevel_id = ?2
            ",
        )
        .bind(language.as_str())
        .bind(sublevel_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("payload").map_err(ser)?;

        match decode_payload(&payload) {
            Some(questions) => Ok(Some(questions)),
            None => {
                // A payload written by an older build or corrupted on disk
                // reads as a miss so the caller regenerates it.
                tracing::warn!(
                    language = language.as_str(),
                    sublevel = sublevel_id.as_str(),
                    "evicting cached content that no longer decodes"
                );
                self.remove(language, sublevel_id).await?;
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
        questions: &[Question],
        generated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let payload = serde_json::to_string(questions).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO content_cache (language, sublevel_id, payload, generated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(language, sublevel_id) DO UPDATE SET
                payload = excluded.payload,
                generated_at = excluded.generated_at
            ",
        )
        .bind(language.as_str())
        .bind(sublevel_id.as_str())
        .bind(payload)
        .bind(generated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn remove(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            DELETE FROM content_cache
            WHERE language = ?1 AND sublevel_id = ?2
            ",
        )
        .bind(language.as_str())
        .bind(sublevel_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn clear_language(&self, language: &LanguageCode) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM content_cache WHERE language = ?1")
            .bind(language.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

fn decode_payload(payload: &str) -> Option<Vec<Question>> {
    let questions: Vec<Question> = serde_json::from_str(payload).ok()?;
    if questions.is_empty() {
        return None;
    }
    if questions.iter().any(|q| q.validate().is_err()) {
        return None;
    }
    Some(questions)
}
