use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::model::ids::{LevelId, SublevelId};

/// Recorded outcome for a single sublevel. Scores only ever move up;
/// a weaker retry never erases an earlier result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SublevelProgress {
    completed: bool,
    best_score: u8,
    attempts: u32,
    last_attempt: DateTime<Utc>,
}

impl SublevelProgress {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            completed: false,
            best_score: 0,
            attempts: 0,
            last_attempt: now,
        }
    }

    /// Rebuilds a record from persisted columns, clamping the score to 100.
    #[must_use]
    pub fn from_persisted(
        completed: bool,
        best_score: u8,
        attempts: u32,
        last_attempt: DateTime<Utc>,
    ) -> Self {
        Self {
            completed,
            best_score: best_score.min(100),
            attempts,
            last_attempt,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn best_score(&self) -> u8 {
        self.best_score
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn last_attempt(&self) -> DateTime<Utc> {
        self.last_attempt
    }
}

/// Running accuracy tally for one skill label ("grammar", "listening").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkillStats {
    attempts: u32,
    accuracy_total: u64,
}

impl SkillStats {
    /// Rebuilds a tally from persisted columns.
    #[must_use]
    pub fn from_persisted(attempts: u32, accuracy_total: u64) -> Self {
        Self {
            attempts,
            accuracy_total,
        }
    }

    fn record(&mut self, accuracy: u8) {
        self.attempts = self.attempts.saturating_add(1);
        self.accuracy_total += u64::from(accuracy.min(100));
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn accuracy_total(&self) -> u64 {
        self.accuracy_total
    }

    /// Mean accuracy over all samples, `None` before the first sample.
    #[must_use]
    pub fn average(&self) -> Option<u8> {
        if self.attempts == 0 {
            return None;
        }
        let mean = self.accuracy_total as f64 / f64::from(self.attempts);
        Some(mean.round() as u8)
    }
}

/// Everything a learner has achieved in one language: per-sublevel
/// records, per-skill accuracy, and accumulated experience points.
///
/// This is a plain in-memory value. Persistence happens outside through
/// the repository layer, which replays rows back in via the `restore_*`
/// methods.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LanguageProgress {
    sublevels: BTreeMap<(LevelId, SublevelId), SublevelProgress>,
    skills: BTreeMap<String, SkillStats>,
    xp: u64,
}

impl LanguageProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Mutations ─────────────────────────────────────────────────────────

    /// Marks a sublevel completed with the given score. Re-completion is
    /// allowed and keeps the best score seen so far.
    pub fn complete_sublevel(
        &mut self,
        level_id: &LevelId,
        sublevel_id: &SublevelId,
        score: u8,
        now: DateTime<Utc>,
    ) -> &SublevelProgress {
        let record = self
            .sublevels
            .entry((level_id.clone(), sublevel_id.clone()))
            .or_insert_with(|| SublevelProgress::fresh(now));
        record.completed = true;
        record.best_score = record.best_score.max(score.min(100));
        record.attempts = record.attempts.saturating_add(1);
        record.last_attempt = now;
        record
    }

    /// Records an attempt that did not complete the sublevel. The best
    /// score still ratchets up and an earlier completion stays in place.
    pub fn record_attempt(
        &mut self,
        level_id: &LevelId,
        sublevel_id: &SublevelId,
        score: u8,
        now: DateTime<Utc>,
    ) -> &SublevelProgress {
        let record = self
            .sublevels
            .entry((level_id.clone(), sublevel_id.clone()))
            .or_insert_with(|| SublevelProgress::fresh(now));
        record.best_score = record.best_score.max(score.min(100));
        record.attempts = record.attempts.saturating_add(1);
        record.last_attempt = now;
        record
    }

    /// Folds one practice answer into the accuracy tally for `skill`.
    pub fn record_skill_sample(&mut self, skill: &str, accuracy: u8) -> &SkillStats {
        let stats = self.skills.entry(skill.to_owned()).or_default();
        stats.record(accuracy);
        stats
    }

    pub fn add_xp(&mut self, amount: u32) -> u64 {
        self.xp = self.xp.saturating_add(u64::from(amount));
        self.xp
    }

    /// Wipes every record for the language.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ─── Queries ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn sublevel(&self, level_id: &LevelId, sublevel_id: &SublevelId) -> Option<&SublevelProgress> {
        self.sublevels
            .get(&(level_id.clone(), sublevel_id.clone()))
    }

    #[must_use]
    pub fn is_sublevel_completed(&self, level_id: &LevelId, sublevel_id: &SublevelId) -> bool {
        self.sublevel(level_id, sublevel_id)
            .is_some_and(SublevelProgress::is_completed)
    }

    /// Best score recorded for the sublevel, `None` without a record.
    #[must_use]
    pub fn sublevel_score(&self, level_id: &LevelId, sublevel_id: &SublevelId) -> Option<u8> {
        self.sublevel(level_id, sublevel_id)
            .map(SublevelProgress::best_score)
    }

    /// Number of sublevel records held for `level_id`, completed or not.
    #[must_use]
    pub fn level_record_count(&self, level_id: &LevelId) -> usize {
        self.sublevels.keys().filter(|(l, _)| l == level_id).count()
    }

    /// A level counts as completed only when the record count matches the
    /// required count exactly and every record is completed. Records for
    /// sublevels no longer in the course therefore lock the level rather
    /// than silently passing it.
    #[must_use]
    pub fn is_level_completed(&self, level_id: &LevelId, required_sublevels: usize) -> bool {
        let mut count = 0;
        for ((l, _), record) in &self.sublevels {
            if l != level_id {
                continue;
            }
            if !record.completed {
                return false;
            }
            count += 1;
        }
        count == required_sublevels
    }

    /// Mean best score over the level's records, rounded half up.
    /// `None` when the level has no records yet.
    #[must_use]
    pub fn level_score(&self, level_id: &LevelId) -> Option<u8> {
        let scores: Vec<u8> = self
            .sublevels
            .iter()
            .filter(|((l, _), _)| l == level_id)
            .map(|(_, r)| r.best_score)
            .collect();
        if scores.is_empty() {
            return None;
        }
        let total: u32 = scores.iter().map(|&s| u32::from(s)).sum();
        Some((f64::from(total) / scores.len() as f64).round() as u8)
    }

    #[must_use]
    pub fn skill_accuracy(&self, skill: &str) -> Option<u8> {
        self.skills.get(skill).and_then(SkillStats::average)
    }

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    #[must_use]
    pub fn completed_sublevel_count(&self) -> usize {
        self.sublevels.values().filter(|r| r.completed).count()
    }

    pub fn sublevels(&self) -> impl Iterator<Item = (&(LevelId, SublevelId), &SublevelProgress)> {
        self.sublevels.iter()
    }

    pub fn skills(&self) -> impl Iterator<Item = (&str, &SkillStats)> {
        self.skills.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    // ─── Persistence Rehydration ───────────────────────────────────────────

    pub fn restore_sublevel(
        &mut self,
        level_id: LevelId,
        sublevel_id: SublevelId,
        record: SublevelProgress,
    ) {
        self.sublevels.insert((level_id, sublevel_id), record);
    }

    pub fn restore_skill(&mut self, skill: String, stats: SkillStats) {
        self.skills.insert(skill, stats);
    }

    pub fn restore_xp(&mut self, xp: u64) {
        self.xp = xp;
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
