use std::sync::Arc;

use lingua_core::Clock;
use lingua_core::model::{Catalog, LanguageCode};
use storage::Storage;

use crate::content_service::ContentService;
use crate::error::AppServicesError;
use crate::generator::{AiConfig, AiGenerator, QuestionGenerator};
use crate::practice::PracticeService;
use crate::progress_service::ProgressService;
use crate::settings_service::SettingsService;

/// Everything the app needs, wired together over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<Catalog>,
    progress: Arc<ProgressService>,
    content: Arc<ContentService>,
    practice: Arc<PracticeService>,
    settings: Arc<SettingsService>,
}

impl AppServices {
    /// Opens the SQLite database, runs migrations and wires every
    /// service over it.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or migrated,
    /// or stored settings cannot be read.
    pub async fn new_sqlite(database_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(database_url).await?;
        Self::assemble(storage, clock).await
    }

    /// Fully in-memory wiring, for tests and throwaway runs.
    ///
    /// # Errors
    ///
    /// Returns an error when stored settings cannot be read.
    pub async fn in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        Self::assemble(Storage::in_memory(), clock).await
    }

    async fn assemble(storage: Storage, clock: Clock) -> Result<Self, AppServicesError> {
        let catalog = Arc::new(Catalog::bundled());
        let settings = Arc::new(SettingsService::new(Arc::clone(&storage.settings)));

        // Environment credentials win over stored ones, so a shell
        // export can override whatever the settings row carries.
        let stored = settings.load().await?;
        let config = AiConfig::from_env().or_else(|| AiConfig::from_settings(&stored));
        let generator: Arc<dyn QuestionGenerator> = Arc::new(AiGenerator::new(config));

        let progress = Arc::new(
            ProgressService::new(Arc::clone(&catalog), Arc::clone(&storage.progress))
                .with_clock(clock),
        );
        let content = Arc::new(
            ContentService::new(
                Arc::clone(&catalog),
                Arc::clone(&storage.content_cache),
                generator,
            )
            .with_clock(clock),
        );
        let practice = Arc::new(
            PracticeService::new(
                Arc::clone(&catalog),
                Arc::clone(&progress),
                Arc::clone(&content),
            )
            .with_clock(clock),
        );

        Ok(Self {
            catalog,
            progress,
            content,
            practice,
            settings,
        })
    }

    /// Picks and activates the startup language: an explicit override
    /// wins, otherwise the stored selection is used. The choice is
    /// written back to settings. Returns the activated language, `None`
    /// when there is nothing to activate.
    ///
    /// # Errors
    ///
    /// Returns an error when the language is unknown or settings cannot
    /// be read or written.
    pub async fn activate_startup_language(
        &self,
        override_language: Option<LanguageCode>,
    ) -> Result<Option<LanguageCode>, AppServicesError> {
        let language = match override_language {
            Some(language) => Some(language),
            None => self.settings.load().await?.selected_language().cloned(),
        };
        let Some(language) = language else {
            return Ok(None);
        };
        self.progress.activate_language(&language).await?;
        self.settings.select_language(Some(&language)).await?;
        Ok(Some(language))
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices").finish_non_exhaustive()
    }
}
