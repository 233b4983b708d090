use lingua_core::model::{LevelId, SublevelId, Theme};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn score_from_i64(v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid score: {v}")))
}

pub(crate) fn level_id_from_str(s: &str) -> Result<LevelId, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn sublevel_id_from_str(s: &str) -> Result<SublevelId, StorageError> {
    s.parse().map_err(ser)
}

/// Converts a stored theme string back into `Theme`.
/// This must stay consistent with `Theme::as_str`.
pub(crate) fn parse_theme(s: &str) -> Result<Theme, StorageError> {
    match s {
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        _ => Err(StorageError::Serialization(format!("invalid theme: {s}"))),
    }
}
