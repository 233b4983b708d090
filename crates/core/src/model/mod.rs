mod catalog;
mod ids;
mod progress;
mod question;
mod settings;

pub use catalog::{
    Catalog, CatalogError, Difficulty, Language, Level, Sublevel, SublevelKind, UnlockRule,
};
pub use ids::{IdError, LanguageCode, LevelId, SublevelId};
pub use progress::{LanguageProgress, SkillStats, SublevelProgress};
pub use question::{Phrase, Question, QuestionError};
pub use settings::{AppSettings, AppSettingsDraft, SettingsError, Theme};
