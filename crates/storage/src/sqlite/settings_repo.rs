use async_trait::async_trait;
use sqlx::Row;

use crate::repository::{SettingsRepository, StorageError};
use lingua_core::model::{AppSettings, AppSettingsDraft, LanguageCode};

use super::SqliteRepository;
use super::mapping::parse_theme;

#[async_trait]
impl SettingsRepository for SqliteRepository {
    async fn get_settings(&self) -> Result<Option<AppSettings>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                selected_language,
                theme,
                ai_api_key,
                ai_model,
                ai_base_url
            FROM app_settings
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let selected_language: Option<String> = row
            .try_get("selected_language")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let theme: String = row
            .try_get("theme")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let ai_api_key: Option<String> = row
            .try_get("ai_api_key")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let ai_model: Option<String> = row
            .try_get("ai_model")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let ai_base_url: Option<String> = row
            .try_get("ai_base_url")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        AppSettingsDraft {
            selected_language,
            theme: parse_theme(&theme)?,
            ai_api_key,
            ai_model,
            ai_base_url,
        }
        .validate()
        .map(Some)
        .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO app_settings (
                id,
                selected_language,
                theme,
                ai_api_key,
                ai_model,
                ai_base_url
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                selected_language = excluded.selected_language,
                theme = excluded.theme,
                ai_api_key = excluded.ai_api_key,
                ai_model = excluded.ai_model,
                ai_base_url = excluded.ai_base_url
            ",
        )
        .bind(1_i64)
        .bind(settings.selected_language().map(LanguageCode::as_str))
        .bind(settings.theme().as_str())
        .bind(settings.ai_api_key())
        .bind(settings.ai_model())
        .bind(settings.ai_base_url())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
