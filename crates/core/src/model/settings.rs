use std::fmt;
use thiserror::Error;
use url::Url;

use crate::model::ids::{IdError, LanguageCode};

/// UI color scheme preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid AI base URL")]
    InvalidBaseUrl,
    #[error("invalid selected language: {0}")]
    InvalidLanguage(#[from] IdError),
}

/// Persisted learner preferences, including the optional credentials for
/// the content generation backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppSettings {
    selected_language: Option<LanguageCode>,
    theme: Theme,
    ai_api_key: Option<String>,
    ai_model: Option<String>,
    ai_base_url: Option<String>,
}

/// Unvalidated settings as edited or as read back from storage.
#[derive(Clone, Debug, Default)]
pub struct AppSettingsDraft {
    pub selected_language: Option<String>,
    pub theme: Theme,
    pub ai_api_key: Option<String>,
    pub ai_model: Option<String>,
    pub ai_base_url: Option<String>,
}

impl AppSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft into persisted settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the base URL is present but invalid, or
    /// the selected language is present but blank.
    pub fn validate(self) -> Result<AppSettings, SettingsError> {
        let selected_language = normalize_optional(self.selected_language)
            .map(LanguageCode::new)
            .transpose()?;
        let ai_api_key = normalize_optional(self.ai_api_key);
        let ai_model = normalize_optional(self.ai_model);
        let ai_base_url = normalize_optional(self.ai_base_url);

        if let Some(url) = ai_base_url.as_ref() {
            if Url::parse(url).is_err() {
                return Err(SettingsError::InvalidBaseUrl);
            }
        }

        Ok(AppSettings {
            selected_language,
            theme: self.theme,
            ai_api_key,
            ai_model,
            ai_base_url,
        })
    }
}

impl AppSettings {
    /// Rebuilds settings from persisted columns, re-running validation.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when stored values no longer validate.
    pub fn from_persisted(
        selected_language: Option<String>,
        theme: Theme,
        ai_api_key: Option<String>,
        ai_model: Option<String>,
        ai_base_url: Option<String>,
    ) -> Result<Self, SettingsError> {
        AppSettingsDraft {
            selected_language,
            theme,
            ai_api_key,
            ai_model,
            ai_base_url,
        }
        .validate()
    }

    #[must_use]
    pub fn selected_language(&self) -> Option<&LanguageCode> {
        self.selected_language.as_ref()
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[must_use]
    pub fn ai_api_key(&self) -> Option<&str> {
        self.ai_api_key.as_deref()
    }

    #[must_use]
    pub fn ai_model(&self) -> Option<&str> {
        self.ai_model.as_deref()
    }

    #[must_use]
    pub fn ai_base_url(&self) -> Option<&str> {
        self.ai_base_url.as_deref()
    }

    /// An editable copy of these settings, for the change-and-revalidate
    /// round trip.
    #[must_use]
    pub fn to_draft(&self) -> AppSettingsDraft {
        AppSettingsDraft {
            selected_language: self
                .selected_language
                .as_ref()
                .map(|code| code.as_str().to_owned()),
            theme: self.theme,
            ai_api_key: self.ai_api_key.clone(),
            ai_model: self.ai_model.clone(),
            ai_base_url: self.ai_base_url.clone(),
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
