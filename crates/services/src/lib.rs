//! Application services: progress tracking, content generation and
//! caching, practice sessions, and settings, composed over the storage
//! crate's repositories.

#![forbid(unsafe_code)]

pub mod app_services;
pub mod content_service;
pub mod error;
pub mod generator;
pub mod practice;
pub mod progress_service;
pub mod settings_service;

pub use lingua_core::Clock;

pub use app_services::AppServices;
pub use content_service::ContentService;
pub use error::{
    AppServicesError, ContentError, GeneratorError, ProgressServiceError, SessionError,
    SettingsServiceError,
};
pub use generator::{AiConfig, AiGenerator, GenerationRequest, QuestionGenerator};
pub use practice::{
    AccuracyScore, FixedScore, PracticeProgress, PracticeService, PracticeSession, ScorePolicy,
    SessionSummary, StepOutcome,
};
pub use progress_service::{LevelOverview, ProgressService};
pub use settings_service::SettingsService;
