use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error produced when an identifier fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} cannot be blank")]
pub struct IdError {
    kind: &'static str,
}

impl IdError {
    fn blank(kind: &'static str) -> Self {
        Self { kind }
    }
}

/// Two-letter style language code ("es", "jp"); normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Creates a `LanguageCode`, trimming and lowercasing the input.
    ///
    /// # Errors
    ///
    /// Returns `IdError` if the code is blank after trimming.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let normalized = raw.into().trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(IdError::blank("language code"));
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a roadmap level ("level-1").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LevelId(String);

impl LevelId {
    /// Creates a `LevelId` from a non-blank string.
    ///
    /// # Errors
    ///
    /// Returns `IdError` if the id is blank after trimming.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let trimmed = raw.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(IdError::blank("level id"));
        }
        Ok(Self(trimmed))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a sublevel within a level ("foundation-vocab").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SublevelId(String);

impl SublevelId {
    /// Creates a `SublevelId` from a non-blank string.
    ///
    /// # Errors
    ///
    /// Returns `IdError` if the id is blank after trimming.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let trimmed = raw.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(IdError::blank("sublevel id"));
        }
        Ok(Self(trimmed))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ─── Conversions ───────────────────────────────────────────────────────────────

impl TryFrom<String> for LanguageCode {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for LevelId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for SublevelId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.0
    }
}

impl From<LevelId> for String {
    fn from(value: LevelId) -> Self {
        value.0
    }
}

impl From<SublevelId> for String {
    fn from(value: SublevelId) -> Self {
        value.0
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SublevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

impl FromStr for LanguageCode {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for LevelId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for SublevelId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_normalizes_case_and_whitespace() {
        let code = LanguageCode::new("  ES ").unwrap();
        assert_eq!(code.as_str(), "es");
        assert_eq!(code.to_string(), "es");
    }

    #[test]
    fn language_code_rejects_blank() {
        assert!(LanguageCode::new("   ").is_err());
    }

    #[test]
    fn level_id_trims_but_keeps_case() {
        let id = LevelId::new(" level-1 ").unwrap();
        assert_eq!(id.as_str(), "level-1");
    }

    #[test]
    fn sublevel_id_from_str_roundtrip() {
        let id: SublevelId = "foundation-vocab".parse().unwrap();
        assert_eq!(id.to_string(), "foundation-vocab");
    }

    #[test]
    fn blank_sublevel_id_fails_to_parse() {
        assert!("".parse::<SublevelId>().is_err());
    }
}
