use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingua_core::model::{
    AppSettings, LanguageCode, LanguageProgress, LevelId, Question, SkillStats, SublevelId,
    SublevelProgress,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of one sublevel record.
///
/// This mirrors the domain `SublevelProgress` so repositories can read and
/// write rows without leaking storage concerns into the domain layer.
#[derive(Debug, Clone)]
pub struct SublevelRecord {
    pub level_id: LevelId,
    pub sublevel_id: SublevelId,
    pub completed: bool,
    pub best_score: u8,
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
}

impl SublevelRecord {
    #[must_use]
    pub fn from_progress(
        level_id: &LevelId,
        sublevel_id: &SublevelId,
        progress: &SublevelProgress,
    ) -> Self {
        Self {
            level_id: level_id.clone(),
            sublevel_id: sublevel_id.clone(),
            completed: progress.is_completed(),
            best_score: progress.best_score(),
            attempts: progress.attempts(),
            last_attempt: progress.last_attempt(),
        }
    }

    /// Convert the record back into its domain pieces.
    #[must_use]
    pub fn into_progress(self) -> (LevelId, SublevelId, SublevelProgress) {
        let progress = SublevelProgress::from_persisted(
            self.completed,
            self.best_score,
            self.attempts,
            self.last_attempt,
        );
        (self.level_id, self.sublevel_id, progress)
    }
}

/// Persisted shape of one skill accuracy tally.
#[derive(Debug, Clone)]
pub struct SkillRecord {
    pub skill: String,
    pub attempts: u32,
    pub accuracy_total: u64,
}

impl SkillRecord {
    #[must_use]
    pub fn from_stats(skill: &str, stats: &SkillStats) -> Self {
        Self {
            skill: skill.to_owned(),
            attempts: stats.attempts(),
            accuracy_total: stats.accuracy_total(),
        }
    }
}

/// Repository contract for learner progress, keyed by language.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load everything recorded for a language. A language that was never
    /// played loads as empty progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if rows cannot be read or decoded.
    async fn load_language(
        &self,
        language: &LanguageCode,
    ) -> Result<LanguageProgress, StorageError>;

    /// Persist or update a single sublevel record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_sublevel(
        &self,
        language: &LanguageCode,
        record: &SublevelRecord,
    ) -> Result<(), StorageError>;

    /// Persist or update a skill tally.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_skill(
        &self,
        language: &LanguageCode,
        record: &SkillRecord,
    ) -> Result<(), StorageError>;

    /// Persist the language's experience points.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set_xp(&self, language: &LanguageCode, xp: u64) -> Result<(), StorageError>;

    /// Delete every record for a language.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deletion fails.
    async fn clear_language(&self, language: &LanguageCode) -> Result<(), StorageError>;
}

/// Repository contract for generated question sets, keyed by
/// language plus sublevel.
#[async_trait]
pub trait ContentCacheRepository: Send + Sync {
    /// Cached questions for the key, `None` on a miss. A payload that no
    /// longer decodes reads as a miss and is evicted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read.
    async fn get(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
    ) -> Result<Option<Vec<Question>>, StorageError>;

    /// Store questions for the key, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be stored.
    async fn set(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
        questions: &[Question],
        generated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Drop the entry for the key, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deletion fails.
    async fn remove(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
    ) -> Result<(), StorageError>;

    /// Drop every cached entry for a language.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deletion fails.
    async fn clear_language(&self, language: &LanguageCode) -> Result<(), StorageError>;
}

/// Repository contract for app settings (a single row).
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Fetch the persisted settings, `None` if never saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read or decoded.
    async fn get_settings(&self) -> Result<Option<AppSettings>, StorageError>;

    /// Persist the settings, replacing any previous row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<LanguageCode, LanguageProgress>>>,
    cache: Arc<Mutex<HashMap<(LanguageCode, SublevelId), Vec<Question>>>>,
    settings: Arc<Mutex<Option<AppSettings>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_language(
        &self,
        language: &LanguageCode,
    ) -> Result<LanguageProgress, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(language).cloned().unwrap_or_default())
    }

    async fn upsert_sublevel(
        &self,
        language: &LanguageCode,
        record: &SublevelRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let entry = guard.entry(language.clone()).or_default();
        let (level_id, sublevel_id, progress) = record.clone().into_progress();
        entry.restore_sublevel(level_id, sublevel_id, progress);
        Ok(())
    }

    async fn upsert_skill(
        &self,
        language: &LanguageCode,
        record: &SkillRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let entry = guard.entry(language.clone()).or_default();
        entry.restore_skill(
            record.skill.clone(),
            SkillStats::from_persisted(record.attempts, record.accuracy_total),
        );
        Ok(())
    }

    async fn set_xp(&self, language: &LanguageCode, xp: u64) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.entry(language.clone()).or_default().restore_xp(xp);
        Ok(())
    }

    async fn clear_language(&self, language: &LanguageCode) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(language);
        Ok(())
    }
}

#[async_trait]
impl ContentCacheRepository for InMemoryRepository {
    async fn get(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
    ) -> Result<Option<Vec<Question>>, StorageError> {
        let guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(language.clone(), sublevel_id.clone())).cloned())
    }

    async fn set(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
        questions: &[Question],
        _generated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((language.clone(), sublevel_id.clone()), questions.to_vec());
        Ok(())
    }

    async fn remove(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&(language.clone(), sublevel_id.clone()));
        Ok(())
    }

    async fn clear_language(&self, language: &LanguageCode) -> Result<(), StorageError> {
        let mut guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.retain(|(lang, _), _| lang != language);
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn get_settings(&self) -> Result<Option<AppSettings>, StorageError> {
        let guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(settings.clone());
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub content_cache: Arc<dyn ContentCacheRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let content_cache: Arc<dyn ContentCacheRepository> = Arc::new(repo.clone());
        let settings: Arc<dyn SettingsRepository> = Arc::new(repo);
        Self {
            progress,
            content_cache,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::Phrase;
    use lingua_core::time::fixed_now;

    fn language() -> LanguageCode {
        LanguageCode::new("es").unwrap()
    }

    fn build_record(level: &str, sublevel: &str, completed: bool, score: u8) -> SublevelRecord {
        SublevelRecord {
            level_id: LevelId::new(level).unwrap(),
            sublevel_id: SublevelId::new(sublevel).unwrap(),
            completed,
            best_score: score,
            attempts: 1,
            last_attempt: fixed_now(),
        }
    }

    fn build_questions() -> Vec<Question> {
        vec![Question::fill_blank(
            Phrase::new("___ means hello", "greeting").unwrap(),
            Phrase::new("Hola", "hello").unwrap(),
        )]
    }

    #[tokio::test]
    async fn round_trips_progress_records() {
        let repo = InMemoryRepository::new();
        repo.upsert_sublevel(&language(), &build_record("level-1", "a", true, 90))
            .await
            .unwrap();
        repo.upsert_skill(
            &language(),
            &SkillRecord {
                skill: "grammar".into(),
                attempts: 2,
                accuracy_total: 150,
            },
        )
        .await
        .unwrap();
        repo.set_xp(&language(), 120).await.unwrap();

        let progress = repo.load_language(&language()).await.unwrap();
        assert!(progress.is_sublevel_completed(
            &LevelId::new("level-1").unwrap(),
            &SublevelId::new("a").unwrap()
        ));
        assert_eq!(progress.skill_accuracy("grammar"), Some(75));
        assert_eq!(progress.xp(), 120);
    }

    #[tokio::test]
    async fn unknown_language_loads_empty() {
        let repo = InMemoryRepository::new();
        let progress = repo.load_language(&language()).await.unwrap();
        assert_eq!(progress.xp(), 0);
        assert_eq!(progress.completed_sublevel_count(), 0);
    }

    #[tokio::test]
    async fn clear_language_only_touches_that_language() {
        let repo = InMemoryRepository::new();
        let fr = LanguageCode::new("fr").unwrap();
        repo.set_xp(&language(), 10).await.unwrap();
        repo.set_xp(&fr, 20).await.unwrap();

        ProgressRepository::clear_language(&repo, &language())
            .await
            .unwrap();
        assert_eq!(repo.load_language(&language()).await.unwrap().xp(), 0);
        assert_eq!(repo.load_language(&fr).await.unwrap().xp(), 20);
    }

    #[tokio::test]
    async fn cache_set_get_remove() {
        let repo = InMemoryRepository::new();
        let sub = SublevelId::new("foundation-vocab").unwrap();
        assert!(repo.get(&language(), &sub).await.unwrap().is_none());

        repo.set(&language(), &sub, &build_questions(), fixed_now())
            .await
            .unwrap();
        let cached = repo.get(&language(), &sub).await.unwrap().unwrap();
        assert_eq!(cached.len(), 1);

        repo.remove(&language(), &sub).await.unwrap();
        assert!(repo.get(&language(), &sub).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_is_keyed_per_language() {
        let repo = InMemoryRepository::new();
        let fr = LanguageCode::new("fr").unwrap();
        let sub = SublevelId::new("foundation-vocab").unwrap();

        repo.set(&language(), &sub, &build_questions(), fixed_now())
            .await
            .unwrap();
        assert!(repo.get(&fr, &sub).await.unwrap().is_none());

        ContentCacheRepository::clear_language(&repo, &language())
            .await
            .unwrap();
        assert!(repo.get(&language(), &sub).await.unwrap().is_none());
    }
}
