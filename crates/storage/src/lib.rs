//! Persistence layer: repository traits, an in-memory backend for tests,
//! and the `SQLite` backend used by the app.

#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ContentCacheRepository, InMemoryRepository, ProgressRepository, SettingsRepository,
    SkillRecord, Storage, StorageError, SublevelRecord,
};
