use lingua_core::model::{LanguageCode, LevelId, SettingsError, SublevelId};
use storage::StorageError;
use thiserror::Error;

//
// ─── PROGRESS ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
pub enum ProgressServiceError {
    /// A read or write was attempted before `activate_language` succeeded.
    #[error("no language is active")]
    NoActiveLanguage,

    #[error("unknown language: {0}")]
    UnknownLanguage(LanguageCode),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

//
// ─── CONTENT GENERATION ──────────────────────────────────────────────────────
//

/// Failure modes of the question backend.
///
/// Cloneable so a single upstream failure can be fanned out to every
/// caller waiting on the same in-flight generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// No API key is configured. Callers should surface this as a setup
    /// problem, not retry it.
    #[error("content generation is not configured: missing API key")]
    MissingCredential,

    #[error("content backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("content backend request failed: {0}")]
    Network(String),

    /// The backend answered but the payload did not contain a usable
    /// question array.
    #[error("content backend returned a malformed payload")]
    MalformedResponse,

    #[error("content backend returned no valid questions")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unknown level: {0}")]
    UnknownLevel(LevelId),

    #[error("unknown sublevel: {0}")]
    UnknownSublevel(SublevelId),

    /// The request that was actually generating for this key went away
    /// without publishing a result.
    #[error("content generation was interrupted")]
    Interrupted,

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

//
// ─── PRACTICE SESSIONS ───────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a session needs at least one question")]
    Empty,

    #[error("the session is already complete")]
    Completed,

    #[error("the session is not complete yet")]
    NotComplete,

    #[error("view the current question before moving on")]
    NotViewed,

    #[error("the current question was already answered")]
    AlreadyAnswered,

    #[error("the answer does not match the current question type")]
    AnswerMismatch,

    #[error("no language is active")]
    NoLanguage,

    #[error("unknown level: {0}")]
    UnknownLevel(LevelId),

    #[error("unknown sublevel: {0}")]
    UnknownSublevel(SublevelId),

    #[error("sublevel {0} is conversation practice, not a question session")]
    ConversationOnly(SublevelId),

    #[error("level {level} is locked: {requirement}")]
    Locked { level: LevelId, requirement: String },

    /// A newer session was started for this service; the finished one
    /// must not write its results.
    #[error("the session was superseded by a newer one")]
    Superseded,

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

//
// ─── SETTINGS ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error(transparent)]
    Invalid(#[from] SettingsError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

//
// ─── COMPOSITION ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] storage::sqlite::SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Progress(#[from] ProgressServiceError),

    #[error(transparent)]
    Settings(#[from] SettingsServiceError),
}
