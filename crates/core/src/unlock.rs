//! Decides which roadmap levels a learner may enter.
//!
//! Gating is deliberately conservative: whenever a rule cannot be
//! resolved against the catalog, the level stays locked.

use std::fmt;

use crate::model::{Catalog, LanguageProgress, Level, LevelId, UnlockRule};

/// Read access the unlock engine needs from progress state.
pub trait ProgressQuery {
    /// True when the level holds exactly `required_sublevels` records and
    /// all of them are completed.
    fn is_level_completed(&self, level_id: &LevelId, required_sublevels: usize) -> bool;
}

impl ProgressQuery for LanguageProgress {
    fn is_level_completed(&self, level_id: &LevelId, required_sublevels: usize) -> bool {
        LanguageProgress::is_level_completed(self, level_id, required_sublevels)
    }
}

/// Whether `level` is currently playable.
///
/// The `default` rule always unlocks. `previousLevel` unlocks once its
/// named level is fully completed. Every other rule gates on the level
/// immediately preceding this one in roadmap order; the mastery details
/// those rules carry are advisory display data, not extra gates.
#[must_use]
pub fn is_level_unlocked<P: ProgressQuery>(
    catalog: &Catalog,
    level: &Level,
    progress: &P,
) -> bool {
    match level.unlock_rule() {
        UnlockRule::Default => true,
        UnlockRule::PreviousLevel { level_id, .. } => {
            target_completed(catalog, level_id, progress)
        }
        UnlockRule::SkillMastery { .. } | UnlockRule::ConversationMastery { .. } => {
            match catalog.level_before(level.id()) {
                Some(previous) => target_completed(catalog, previous.id(), progress),
                None => false,
            }
        }
    }
}

fn target_completed<P: ProgressQuery>(
    catalog: &Catalog,
    target: &LevelId,
    progress: &P,
) -> bool {
    let required = catalog.required_sublevel_count(target);
    if required == 0 {
        // Unknown target or a level without sublevels. Stay locked.
        return false;
    }
    progress.is_level_completed(target, required)
}

/// Why a level is gated, for display next to a locked level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockReason {
    CompletePrevious {
        title: String,
    },
    MasterSkill {
        title: String,
        skill: String,
        min_accuracy: u8,
    },
    MasterConversation {
        title: String,
        min_accuracy: u8,
    },
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompletePrevious { title } => {
                write!(f, "Complete \"{title}\" to unlock")
            }
            Self::MasterSkill {
                title,
                skill,
                min_accuracy,
            } => {
                write!(
                    f,
                    "Complete \"{title}\" to unlock (aim for {min_accuracy}% {skill} accuracy)"
                )
            }
            Self::MasterConversation {
                title,
                min_accuracy,
            } => {
                write!(
                    f,
                    "Complete \"{title}\" to unlock (aim for {min_accuracy}% conversation accuracy)"
                )
            }
        }
    }
}

/// Describes the requirement behind a level's gate, independent of
/// progress. `None` for a level that is always unlocked.
#[must_use]
pub fn lock_reason(catalog: &Catalog, level: &Level) -> Option<LockReason> {
    match level.unlock_rule() {
        UnlockRule::Default => None,
        UnlockRule::PreviousLevel { level_id, .. } => Some(LockReason::CompletePrevious {
            title: display_title(catalog, level_id),
        }),
        UnlockRule::SkillMastery { skill, min_accuracy } => Some(LockReason::MasterSkill {
            title: predecessor_title(catalog, level),
            skill: skill.clone(),
            min_accuracy: *min_accuracy,
        }),
        UnlockRule::ConversationMastery { min_accuracy } => {
            Some(LockReason::MasterConversation {
                title: predecessor_title(catalog, level),
                min_accuracy: *min_accuracy,
            })
        }
    }
}

fn display_title(catalog: &Catalog, id: &LevelId) -> String {
    catalog
        .level(id)
        .map_or_else(|| id.to_string(), |l| l.title().to_owned())
}

fn predecessor_title(catalog: &Catalog, level: &Level) -> String {
    catalog
        .level_before(level.id())
        .map_or_else(|| "the previous level".to_owned(), |l| l.title().to_owned())
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
