use std::sync::{Arc, Mutex, MutexGuard};

use lingua_core::Clock;
use lingua_core::model::{Catalog, LanguageCode, LanguageProgress, LevelId, SublevelId};
use lingua_core::unlock;
use storage::{ProgressRepository, SkillRecord, SublevelRecord};

use crate::error::ProgressServiceError;

/// One roadmap row, resolved against the active language's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelOverview {
    pub level_id: LevelId,
    pub title: String,
    pub unlocked: bool,
    pub completed: bool,
    pub score: Option<u8>,
    pub completed_sublevels: usize,
    pub total_sublevels: usize,
    /// Human-readable requirement, present only while the level is locked.
    pub lock_reason: Option<String>,
}

struct ActiveLanguage {
    language: LanguageCode,
    progress: LanguageProgress,
}

/// Progress for the active language: an in-memory working copy backed by
/// the progress repository.
///
/// Reads are synchronous and fail closed: before a language is activated
/// (or if activation never happened) every completion query answers
/// "not completed" and only default-rule levels count as unlocked.
/// Mutations update the working copy first and then persist the touched
/// row; a persist failure surfaces as an error while the next
/// `activate_language` reloads the stored truth.
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<Catalog>,
    repository: Arc<dyn ProgressRepository>,
    state: Mutex<Option<ActiveLanguage>>,
}

impl ProgressService {
    pub fn new(catalog: Arc<Catalog>, repository: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock: Clock::default(),
            catalog,
            repository,
            state: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Makes `language` the active one, replacing any previous working
    /// copy with a full reload from storage.
    ///
    /// # Errors
    ///
    /// Returns an error when the language is not in the catalog or the
    /// stored progress cannot be loaded.
    pub async fn activate_language(
        &self,
        language: &LanguageCode,
    ) -> Result<(), ProgressServiceError> {
        if self.catalog.language(language).is_none() {
            return Err(ProgressServiceError::UnknownLanguage(language.clone()));
        }
        let progress = self.repository.load_language(language).await?;
        let mut guard = self.lock_state()?;
        *guard = Some(ActiveLanguage {
            language: language.clone(),
            progress,
        });
        Ok(())
    }

    #[must_use]
    pub fn active_language(&self) -> Option<LanguageCode> {
        self.read(|language, _| language.clone())
    }

    // ─── Queries ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn is_sublevel_completed(&self, level_id: &LevelId, sublevel_id: &SublevelId) -> bool {
        self.read(|_, progress| progress.is_sublevel_completed(level_id, sublevel_id))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn sublevel_score(&self, level_id: &LevelId, sublevel_id: &SublevelId) -> Option<u8> {
        self.read(|_, progress| progress.sublevel_score(level_id, sublevel_id))
            .flatten()
    }

    /// Whether every sublevel the catalog lists for the level is
    /// completed. Unknown levels are never completed.
    #[must_use]
    pub fn is_level_completed(&self, level_id: &LevelId) -> bool {
        let required = self.catalog.required_sublevel_count(level_id);
        if required == 0 {
            return false;
        }
        self.read(|_, progress| progress.is_level_completed(level_id, required))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn level_score(&self, level_id: &LevelId) -> Option<u8> {
        self.read(|_, progress| progress.level_score(level_id))
            .flatten()
    }

    #[must_use]
    pub fn is_level_unlocked(&self, level_id: &LevelId) -> bool {
        let Some(level) = self.catalog.level(level_id) else {
            return false;
        };
        self.read(|_, progress| unlock::is_level_unlocked(&self.catalog, level, progress))
            .unwrap_or_else(|| {
                unlock::is_level_unlocked(&self.catalog, level, &LanguageProgress::new())
            })
    }

    #[must_use]
    pub fn skill_accuracy(&self, skill: &str) -> Option<u8> {
        self.read(|_, progress| progress.skill_accuracy(skill))
            .flatten()
    }

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.read(|_, progress| progress.xp()).unwrap_or(0)
    }

    #[must_use]
    pub fn completed_sublevel_count(&self) -> usize {
        self.read(|_, progress| progress.completed_sublevel_count())
            .unwrap_or(0)
    }

    /// The full roadmap with per-level unlock status for the active
    /// language. Works before activation too, where it reflects an empty
    /// progress record.
    #[must_use]
    pub fn roadmap(&self) -> Vec<LevelOverview> {
        self.catalog
            .levels()
            .iter()
            .map(|level| {
                let unlocked = self.is_level_unlocked(level.id());
                let lock_reason = if unlocked {
                    None
                } else {
                    unlock::lock_reason(&self.catalog, level).map(|reason| reason.to_string())
                };
                let completed_sublevels = level
                    .sublevels()
                    .iter()
                    .filter(|sublevel| self.is_sublevel_completed(level.id(), sublevel.id()))
                    .count();
                LevelOverview {
                    level_id: level.id().clone(),
                    title: level.title().to_owned(),
                    unlocked,
                    completed: self.is_level_completed(level.id()),
                    score: self.level_score(level.id()),
                    completed_sublevels,
                    total_sublevels: level.sublevels().len(),
                    lock_reason,
                }
            })
            .collect()
    }

    // ─── Mutations ─────────────────────────────────────────────────────────

    /// Marks a sublevel completed and persists the updated row.
    ///
    /// # Errors
    ///
    /// Returns an error when no language is active or the write fails.
    pub async fn complete_sublevel(
        &self,
        level_id: &LevelId,
        sublevel_id: &SublevelId,
        score: u8,
    ) -> Result<(), ProgressServiceError> {
        let now = self.clock.now();
        let (language, record) = {
            let mut guard = self.lock_state()?;
            let active = guard.as_mut().ok_or(ProgressServiceError::NoActiveLanguage)?;
            let progress = active
                .progress
                .complete_sublevel(level_id, sublevel_id, score, now);
            (
                active.language.clone(),
                SublevelRecord::from_progress(level_id, sublevel_id, progress),
            )
        };
        self.repository.upsert_sublevel(&language, &record).await?;
        Ok(())
    }

    /// Records a failed or partial attempt without completing the
    /// sublevel, then persists the updated row.
    ///
    /// # Errors
    ///
    /// Returns an error when no language is active or the write fails.
    pub async fn record_attempt(
        &self,
        level_id: &LevelId,
        sublevel_id: &SublevelId,
        score: u8,
    ) -> Result<(), ProgressServiceError> {
        let now = self.clock.now();
        let (language, record) = {
            let mut guard = self.lock_state()?;
            let active = guard.as_mut().ok_or(ProgressServiceError::NoActiveLanguage)?;
            let progress = active
                .progress
                .record_attempt(level_id, sublevel_id, score, now);
            (
                active.language.clone(),
                SublevelRecord::from_progress(level_id, sublevel_id, progress),
            )
        };
        self.repository.upsert_sublevel(&language, &record).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error when no language is active or the write fails.
    pub async fn record_skill_sample(
        &self,
        skill: &str,
        accuracy: u8,
    ) -> Result<(), ProgressServiceError> {
        let (language, record) = {
            let mut guard = self.lock_state()?;
            let active = guard.as_mut().ok_or(ProgressServiceError::NoActiveLanguage)?;
            let stats = active.progress.record_skill_sample(skill, accuracy);
            (active.language.clone(), SkillRecord::from_stats(skill, stats))
        };
        self.repository.upsert_skill(&language, &record).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error when no language is active or the write fails.
    pub async fn add_xp(&self, amount: u32) -> Result<(), ProgressServiceError> {
        let (language, total) = {
            let mut guard = self.lock_state()?;
            let active = guard.as_mut().ok_or(ProgressServiceError::NoActiveLanguage)?;
            let total = active.progress.add_xp(amount);
            (active.language.clone(), total)
        };
        self.repository.set_xp(&language, total).await?;
        Ok(())
    }

    /// Wipes the active language's progress, in memory and in storage.
    ///
    /// # Errors
    ///
    /// Returns an error when no language is active or the write fails.
    pub async fn reset_active_language(&self) -> Result<(), ProgressServiceError> {
        let language = {
            let mut guard = self.lock_state()?;
            let active = guard.as_mut().ok_or(ProgressServiceError::NoActiveLanguage)?;
            active.progress.reset();
            active.language.clone()
        };
        self.repository.clear_language(&language).await?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&LanguageCode, &LanguageProgress) -> T) -> Option<T> {
        let guard = self.state.lock().ok()?;
        let active = guard.as_ref()?;
        Some(f(&active.language, &active.progress))
    }

    // A poisoned state lock means the working copy can no longer be
    // trusted; treat it the same as having no active language.
    fn lock_state(&self) -> Result<MutexGuard<'_, Option<ActiveLanguage>>, ProgressServiceError> {
        self.state
            .lock()
            .map_err(|_| ProgressServiceError::NoActiveLanguage)
    }
}

impl std::fmt::Debug for ProgressService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressService")
            .field("active_language", &self.active_language())
            .finish_non_exhaustive()
    }
}
