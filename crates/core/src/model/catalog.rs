use serde::Deserialize;
use thiserror::Error;

use crate::model::ids::{LanguageCode, LevelId, SublevelId};

/// Error produced when course data cannot be loaded or is internally
/// inconsistent.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate language code {0}")]
    DuplicateLanguage(LanguageCode),
    #[error("duplicate level id {0}")]
    DuplicateLevel(LevelId),
    #[error("duplicate sublevel id {sublevel} in level {level}")]
    DuplicateSublevel { level: LevelId, sublevel: SublevelId },
    #[error("level {0} has no sublevels")]
    EmptySublevels(LevelId),
    #[error("first level {0} must use the default unlock rule")]
    FirstLevelLocked(LevelId),
    #[error("level {level} unlocks from unknown level {target}")]
    UnknownUnlockTarget { level: LevelId, target: LevelId },
}

/// Relative difficulty shown on the language picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A language offered by the course, with its display metadata.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    code: LanguageCode,
    name: String,
    native_name: String,
    flag: String,
    difficulty: Difficulty,
}

impl Language {
    #[must_use]
    pub fn code(&self) -> &LanguageCode {
        &self.code
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn native_name(&self) -> &str {
        &self.native_name
    }

    #[must_use]
    pub fn flag(&self) -> &str {
        &self.flag
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

/// Whether a sublevel is ordinary practice or a level checkpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SublevelKind {
    #[default]
    Practice,
    Assessment,
}

/// One practice unit inside a level.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sublevel {
    sublevel_id: SublevelId,
    title: String,
    #[serde(default)]
    kind: SublevelKind,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    ai_conversation: bool,
}

impl Sublevel {
    #[must_use]
    pub fn id(&self) -> &SublevelId {
        &self.sublevel_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> SublevelKind {
        self.kind
    }

    /// Skill labels practiced here, used for accuracy bookkeeping.
    #[must_use]
    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    #[must_use]
    pub fn is_assessment(&self) -> bool {
        self.kind == SublevelKind::Assessment
    }

    /// True when the sublevel is driven by a live conversation exchange
    /// rather than generated questions.
    #[must_use]
    pub fn is_ai_conversation(&self) -> bool {
        self.ai_conversation
    }
}

/// Declarative gate deciding when a level becomes playable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UnlockRule {
    /// Always unlocked. Only valid on the first level of the roadmap.
    #[default]
    Default,
    /// Requires the named level to be fully completed.
    #[serde(rename_all = "camelCase")]
    PreviousLevel {
        level_id: LevelId,
        #[serde(default)]
        min_score: Option<u8>,
    },
    /// Advisory mastery requirement; gating still follows the
    /// immediately preceding level.
    #[serde(rename_all = "camelCase")]
    SkillMastery { skill: String, min_accuracy: u8 },
    /// Advisory conversation requirement; gating still follows the
    /// immediately preceding level.
    #[serde(rename_all = "camelCase")]
    ConversationMastery { min_accuracy: u8 },
}

/// One stage of the learning roadmap.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    level_id: LevelId,
    title: String,
    goal: String,
    sublevels: Vec<Sublevel>,
    #[serde(default)]
    unlock_rule: UnlockRule,
}

impl Level {
    #[must_use]
    pub fn id(&self) -> &LevelId {
        &self.level_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    #[must_use]
    pub fn sublevels(&self) -> &[Sublevel] {
        &self.sublevels
    }

    #[must_use]
    pub fn unlock_rule(&self) -> &UnlockRule {
        &self.unlock_rule
    }

    #[must_use]
    pub fn sublevel(&self, id: &SublevelId) -> Option<&Sublevel> {
        self.sublevels.iter().find(|s| s.id() == id)
    }
}

#[derive(Deserialize)]
struct Roadmap {
    levels: Vec<Level>,
}

#[derive(Deserialize)]
struct CatalogFile {
    languages: Vec<Language>,
    roadmap: Roadmap,
}

/// The immutable course definition: offered languages plus the ordered
/// level roadmap shared by all of them.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    languages: Vec<Language>,
    levels: Vec<Level>,
}

impl Catalog {
    /// Parses and validates course data from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the JSON is malformed, ids collide, a
    /// level has no sublevels, the first level is not `default`, or an
    /// unlock rule points at a level that does not exist.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let catalog = Self {
            languages: file.languages,
            levels: file.roadmap.levels,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads the course definition compiled into the binary.
    ///
    /// # Panics
    ///
    /// Panics if the bundled course data is malformed; covered by tests.
    #[must_use]
    pub fn bundled() -> Self {
        Self::from_json_str(include_str!("course.json"))
            .expect("bundled course data should be valid")
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for (i, language) in self.languages.iter().enumerate() {
            if self.languages[..i].iter().any(|l| l.code() == language.code()) {
                return Err(CatalogError::DuplicateLanguage(language.code().clone()));
            }
        }
        for (i, level) in self.levels.iter().enumerate() {
            if self.levels[..i].iter().any(|l| l.id() == level.id()) {
                return Err(CatalogError::DuplicateLevel(level.id().clone()));
            }
            if level.sublevels.is_empty() {
                return Err(CatalogError::EmptySublevels(level.id().clone()));
            }
            for (j, sublevel) in level.sublevels.iter().enumerate() {
                if level.sublevels[..j].iter().any(|s| s.id() == sublevel.id()) {
                    return Err(CatalogError::DuplicateSublevel {
                        level: level.id().clone(),
                        sublevel: sublevel.id().clone(),
                    });
                }
            }
            if i == 0 && *level.unlock_rule() != UnlockRule::Default {
                return Err(CatalogError::FirstLevelLocked(level.id().clone()));
            }
            if let UnlockRule::PreviousLevel { level_id, .. } = level.unlock_rule() {
                if !self.levels.iter().any(|l| l.id() == level_id) {
                    return Err(CatalogError::UnknownUnlockTarget {
                        level: level.id().clone(),
                        target: level_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    #[must_use]
    pub fn language(&self, code: &LanguageCode) -> Option<&Language> {
        self.languages.iter().find(|l| l.code() == code)
    }

    /// Levels in roadmap order.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    #[must_use]
    pub fn level(&self, id: &LevelId) -> Option<&Level> {
        self.levels.iter().find(|l| l.id() == id)
    }

    /// The level immediately preceding `id` in roadmap order, `None` for
    /// the first level or an unknown id.
    #[must_use]
    pub fn level_before(&self, id: &LevelId) -> Option<&Level> {
        let position = self.levels.iter().position(|l| l.id() == id)?;
        position.checked_sub(1).map(|prev| &self.levels[prev])
    }

    /// Number of sublevels a learner must complete to finish the level.
    /// Zero for an unknown level id.
    #[must_use]
    pub fn required_sublevel_count(&self, id: &LevelId) -> usize {
        self.level(id).map_or(0, |l| l.sublevels.len())
    }

    #[must_use]
    pub fn sublevel(&self, level_id: &LevelId, sublevel_id: &SublevelId) -> Option<&Sublevel> {
        self.level(level_id)?.sublevel(sublevel_id)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_json(levels: &str) -> String {
        format!(
            r#"{{
                "languages": [
                    {{"code": "es", "name": "Spanish", "nativeName": "Español", "flag": "🇪🇸", "difficulty": "easy"}}
                ],
                "roadmap": {{ "levels": {levels} }}
            }}"#
        )
    }

    fn two_level_json() -> String {
        catalog_json(
            r#"[
                {
                    "levelId": "level-1",
                    "title": "Foundation",
                    "goal": "Learn the basics",
                    "sublevels": [
                        {"sublevelId": "foundation-vocab", "title": "Everyday Vocabulary", "skills": ["vocabulary"]},
                        {"sublevelId": "foundation-check", "title": "Foundation Checkpoint", "kind": "assessment"}
                    ]
                },
                {
                    "levelId": "level-2",
                    "title": "Core Builder",
                    "goal": "Build full sentences",
                    "unlockRule": {"type": "previousLevel", "levelId": "level-1", "minScore": 80},
                    "sublevels": [
                        {"sublevelId": "core-sentences", "title": "Sentence Patterns", "skills": ["grammar"]}
                    ]
                }
            ]"#,
        )
    }

    #[test]
    fn parses_levels_and_rules() {
        let catalog = Catalog::from_json_str(&two_level_json()).unwrap();
        assert_eq!(catalog.levels().len(), 2);

        let level_2 = catalog.level(&LevelId::new("level-2").unwrap()).unwrap();
        match level_2.unlock_rule() {
            UnlockRule::PreviousLevel { level_id, min_score } => {
                assert_eq!(level_id.as_str(), "level-1");
                assert_eq!(*min_score, Some(80));
            }
            other => panic!("unexpected rule: {other:?}"),
        }
    }

    #[test]
    fn sublevel_kind_defaults_to_practice() {
        let catalog = Catalog::from_json_str(&two_level_json()).unwrap();
        let level_1 = catalog.level(&LevelId::new("level-1").unwrap()).unwrap();

        assert_eq!(level_1.sublevels()[0].kind(), SublevelKind::Practice);
        assert!(level_1.sublevels()[1].is_assessment());
    }

    #[test]
    fn level_before_follows_roadmap_order() {
        let catalog = Catalog::from_json_str(&two_level_json()).unwrap();
        let level_2 = LevelId::new("level-2").unwrap();

        let previous = catalog.level_before(&level_2).unwrap();
        assert_eq!(previous.id().as_str(), "level-1");
        assert!(catalog.level_before(&LevelId::new("level-1").unwrap()).is_none());
        assert!(catalog.level_before(&LevelId::new("level-9").unwrap()).is_none());
    }

    #[test]
    fn required_count_is_zero_for_unknown_level() {
        let catalog = Catalog::from_json_str(&two_level_json()).unwrap();
        assert_eq!(catalog.required_sublevel_count(&LevelId::new("level-1").unwrap()), 2);
        assert_eq!(catalog.required_sublevel_count(&LevelId::new("ghost").unwrap()), 0);
    }

    #[test]
    fn rejects_duplicate_level_ids() {
        let json = catalog_json(
            r#"[
                {"levelId": "level-1", "title": "A", "goal": "g", "sublevels": [{"sublevelId": "s1", "title": "S"}]},
                {"levelId": "level-1", "title": "B", "goal": "g", "sublevels": [{"sublevelId": "s2", "title": "S"}]}
            ]"#,
        );
        assert!(matches!(
            Catalog::from_json_str(&json),
            Err(CatalogError::DuplicateLevel(_))
        ));
    }

    #[test]
    fn rejects_unknown_unlock_target() {
        let json = catalog_json(
            r#"[
                {"levelId": "level-1", "title": "A", "goal": "g", "sublevels": [{"sublevelId": "s1", "title": "S"}]},
                {
                    "levelId": "level-2", "title": "B", "goal": "g",
                    "unlockRule": {"type": "previousLevel", "levelId": "level-7"},
                    "sublevels": [{"sublevelId": "s2", "title": "S"}]
                }
            ]"#,
        );
        assert!(matches!(
            Catalog::from_json_str(&json),
            Err(CatalogError::UnknownUnlockTarget { .. })
        ));
    }

    #[test]
    fn rejects_locked_first_level() {
        let json = catalog_json(
            r#"[
                {
                    "levelId": "level-1", "title": "A", "goal": "g",
                    "unlockRule": {"type": "conversationMastery", "minAccuracy": 75},
                    "sublevels": [{"sublevelId": "s1", "title": "S"}]
                }
            ]"#,
        );
        assert!(matches!(
            Catalog::from_json_str(&json),
            Err(CatalogError::FirstLevelLocked(_))
        ));
    }

    #[test]
    fn rejects_level_without_sublevels() {
        let json = catalog_json(
            r#"[{"levelId": "level-1", "title": "A", "goal": "g", "sublevels": []}]"#,
        );
        assert!(matches!(
            Catalog::from_json_str(&json),
            Err(CatalogError::EmptySublevels(_))
        ));
    }

    #[test]
    fn bundled_course_data_is_valid() {
        let catalog = Catalog::bundled();
        assert_eq!(catalog.languages().len(), 6);
        assert!(!catalog.levels().is_empty());
        assert_eq!(*catalog.levels()[0].unlock_rule(), UnlockRule::Default);

        // Every level must be reachable through the validation rules the
        // loader enforces, and each one ends in a checkpoint.
        for level in catalog.levels() {
            assert!(level.sublevels().iter().any(Sublevel::is_assessment));
        }
    }
}
