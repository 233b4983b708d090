use std::sync::Arc;

use lingua_core::model::{AppSettings, AppSettingsDraft, LanguageCode};
use storage::SettingsRepository;

use crate::error::SettingsServiceError;

/// Loads and saves the app settings row, validating every change.
#[derive(Clone)]
pub struct SettingsService {
    repository: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repository: Arc<dyn SettingsRepository>) -> Self {
        Self { repository }
    }

    /// The stored settings, or defaults when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings row cannot be read.
    pub async fn load(&self) -> Result<AppSettings, SettingsServiceError> {
        Ok(self.repository.get_settings().await?.unwrap_or_default())
    }

    /// Validates the draft and persists it.
    ///
    /// # Errors
    ///
    /// Returns an error when validation fails or the row cannot be
    /// written.
    pub async fn save(&self, draft: AppSettingsDraft) -> Result<AppSettings, SettingsServiceError> {
        let settings = draft.validate()?;
        self.repository.save_settings(&settings).await?;
        Ok(settings)
    }

    /// Stores the language to activate on the next launch, or clears it.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings cannot be read or written.
    pub async fn select_language(
        &self,
        language: Option<&LanguageCode>,
    ) -> Result<AppSettings, SettingsServiceError> {
        let mut draft = self.load().await?.to_draft();
        draft.selected_language = language.map(|code| code.as_str().to_owned());
        self.save(draft).await
    }

    /// Stores or clears the generation credential. There is no signal to
    /// running services; callers rebuild or retry explicitly once the
    /// key is in place.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings cannot be read or written.
    pub async fn store_credential(
        &self,
        api_key: Option<String>,
    ) -> Result<AppSettings, SettingsServiceError> {
        let mut draft = self.load().await?.to_draft();
        draft.ai_api_key = api_key;
        self.save(draft).await
    }

    /// # Errors
    ///
    /// Returns an error when the settings cannot be read or written.
    pub async fn toggle_theme(&self) -> Result<AppSettings, SettingsServiceError> {
        let mut draft = self.load().await?.to_draft();
        draft.theme = draft.theme.toggled();
        self.save(draft).await
    }
}

impl std::fmt::Debug for SettingsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::{SettingsError, Theme};
    use storage::InMemoryRepository;

    fn service() -> SettingsService {
        SettingsService::new(Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn loads_defaults_when_nothing_is_stored() {
        let service = service();
        let settings = service.load().await.expect("load");
        assert_eq!(settings, AppSettings::default());
    }

    #[tokio::test]
    async fn save_validates_the_draft() {
        let service = service();
        let mut draft = AppSettingsDraft::new();
        draft.ai_base_url = Some("not a url".into());

        let result = service.save(draft).await;
        assert!(matches!(
            result,
            Err(SettingsServiceError::Invalid(SettingsError::InvalidBaseUrl))
        ));
    }

    #[tokio::test]
    async fn selected_language_round_trips() {
        let service = service();
        let code: LanguageCode = "es".parse().expect("code");

        service.select_language(Some(&code)).await.expect("select");
        let settings = service.load().await.expect("load");
        assert_eq!(settings.selected_language(), Some(&code));

        service.select_language(None).await.expect("clear");
        let settings = service.load().await.expect("load");
        assert_eq!(settings.selected_language(), None);
    }

    #[tokio::test]
    async fn toggling_the_theme_flips_and_persists() {
        let service = service();
        let settings = service.toggle_theme().await.expect("toggle");
        assert_eq!(settings.theme(), Theme::Dark);

        let reloaded = service.load().await.expect("load");
        assert_eq!(reloaded.theme(), Theme::Dark);
    }

    #[tokio::test]
    async fn a_stored_credential_enables_generation_config() {
        let service = service();
        let initial = service.load().await.expect("load");
        assert!(crate::generator::AiConfig::from_settings(&initial).is_none());

        let settings = service
            .store_credential(Some("fresh-key".into()))
            .await
            .expect("store");
        assert_eq!(settings.ai_api_key(), Some("fresh-key"));
        assert!(crate::generator::AiConfig::from_settings(&settings).is_some());

        let cleared = service.store_credential(None).await.expect("clear");
        assert_eq!(cleared.ai_api_key(), None);
    }
}
