use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lingua_core::model::{Catalog, LevelId, SublevelId};
use lingua_core::{Clock, scoring, unlock};

use crate::content_service::ContentService;
use crate::error::SessionError;
use crate::practice::policy::{AccuracyScore, FixedScore, ScorePolicy};
use crate::practice::session::{PracticeSession, StepOutcome};
use crate::progress_service::ProgressService;

/// What a finished session amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub score: u8,
    /// Assessments pass at the checkpoint threshold; practice runs
    /// always pass.
    pub passed: bool,
    /// Whether the sublevel was marked completed.
    pub completed: bool,
    pub xp_awarded: u32,
    pub correct: usize,
    pub total: usize,
}

/// Starts sessions and writes their results back into progress.
///
/// Only the most recently started session may finalize: starting a new
/// one supersedes everything before it, so a stale completion arriving
/// late cannot overwrite newer progress. Practice sublevels score by
/// completion and assessments by accuracy, gated on the passing
/// threshold.
pub struct PracticeService {
    clock: Clock,
    catalog: Arc<Catalog>,
    progress: Arc<ProgressService>,
    content: Arc<ContentService>,
    practice_policy: Arc<dyn ScorePolicy>,
    assessment_policy: Arc<dyn ScorePolicy>,
    active_token: AtomicU64,
}

impl PracticeService {
    pub fn new(
        catalog: Arc<Catalog>,
        progress: Arc<ProgressService>,
        content: Arc<ContentService>,
    ) -> Self {
        Self {
            clock: Clock::default(),
            catalog,
            progress,
            content,
            practice_policy: Arc::new(FixedScore::COMPLETION),
            assessment_policy: Arc::new(AccuracyScore),
            active_token: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Swaps the scoring policy used for practice sublevels. Assessments
    /// keep accuracy scoring, since the passing gate depends on it.
    #[must_use]
    pub fn with_practice_policy(mut self, policy: Arc<dyn ScorePolicy>) -> Self {
        self.practice_policy = policy;
        self
    }

    /// Opens a session for a sublevel, loading or generating its
    /// questions. The new session supersedes any session started
    /// earlier.
    ///
    /// # Errors
    ///
    /// Returns an error when the sublevel does not exist or is
    /// conversation practice, no language is active, the level is
    /// locked, or content cannot be loaded.
    pub async fn start_session(
        &self,
        level_id: &LevelId,
        sublevel_id: &SublevelId,
    ) -> Result<PracticeSession, SessionError> {
        let level = self
            .catalog
            .level(level_id)
            .ok_or_else(|| SessionError::UnknownLevel(level_id.clone()))?;
        let sublevel = level
            .sublevel(sublevel_id)
            .ok_or_else(|| SessionError::UnknownSublevel(sublevel_id.clone()))?;
        if sublevel.is_ai_conversation() {
            return Err(SessionError::ConversationOnly(sublevel_id.clone()));
        }
        let language = self
            .progress
            .active_language()
            .ok_or(SessionError::NoLanguage)?;
        if !self.progress.is_level_unlocked(level_id) {
            let requirement = unlock::lock_reason(&self.catalog, level).map_or_else(
                || "complete the earlier levels first".to_owned(),
                |reason| reason.to_string(),
            );
            return Err(SessionError::Locked {
                level: level_id.clone(),
                requirement,
            });
        }

        let questions = self
            .content
            .load_or_generate(&language, level_id, sublevel_id)
            .await?;
        let token = self.active_token.fetch_add(1, Ordering::SeqCst) + 1;
        let session = PracticeSession::new(
            language,
            level_id.clone(),
            sublevel_id.clone(),
            sublevel.is_assessment(),
            sublevel.skills().to_vec(),
            questions,
            self.clock.now(),
        )?
        .with_token(token);
        tracing::info!(
            level = %level_id,
            sublevel = %sublevel_id,
            questions = session.total_questions(),
            assessment = session.is_assessment(),
            "practice session started"
        );
        Ok(session)
    }

    /// Advances the session, finalizing it when the last question is
    /// passed.
    ///
    /// # Errors
    ///
    /// Returns the session's own gating errors, or a finalization error;
    /// the session stays complete and `finalize` can be retried.
    pub async fn advance(
        &self,
        session: &mut PracticeSession,
    ) -> Result<StepOutcome, SessionError> {
        let outcome = session.advance(self.clock.now())?;
        if matches!(outcome, StepOutcome::Completed) {
            self.finalize(session).await?;
        }
        Ok(outcome)
    }

    /// Writes a completed session's results into progress and returns the
    /// summary. Already-finalized sessions return their summary again,
    /// and the writes themselves are idempotent, so this is safe to
    /// retry after a storage failure.
    ///
    /// # Errors
    ///
    /// Returns `NotComplete` while questions remain, `Superseded` when a
    /// newer session was started or the language changed, or the
    /// underlying progress error.
    pub async fn finalize(
        &self,
        session: &mut PracticeSession,
    ) -> Result<SessionSummary, SessionError> {
        if let Some(summary) = session.summary() {
            return Ok(summary);
        }
        if !session.is_complete() {
            return Err(SessionError::NotComplete);
        }
        if self.active_token.load(Ordering::SeqCst) != session.token() {
            return Err(SessionError::Superseded);
        }
        match self.progress.active_language() {
            Some(language) if language == *session.language() => {}
            _ => return Err(SessionError::Superseded),
        }

        let correct = session.correct_count();
        let total = session.total_questions();
        let summary = if session.is_assessment() {
            let score = self.assessment_policy.session_score(session);
            if scoring::checkpoint_passed(score, scoring::PASSING_SCORE) {
                self.complete(session, score, true).await?
            } else {
                self.progress
                    .record_attempt(session.level_id(), session.sublevel_id(), score)
                    .await?;
                SessionSummary {
                    score,
                    passed: false,
                    completed: false,
                    xp_awarded: 0,
                    correct,
                    total,
                }
            }
        } else {
            let score = self.practice_policy.session_score(session);
            self.complete(session, score, false).await?
        };

        // Skill stats track answer accuracy, so a run without a single
        // answered question contributes no samples.
        if session.answered_count() > 0 {
            let accuracy = scoring::session_score(correct, session.answered_count());
            for skill in session.skills() {
                self.progress.record_skill_sample(skill, accuracy).await?;
            }
        }

        session.set_summary(summary);
        tracing::info!(
            level = %session.level_id(),
            sublevel = %session.sublevel_id(),
            score = summary.score,
            passed = summary.passed,
            xp = summary.xp_awarded,
            "practice session finalized"
        );
        Ok(summary)
    }

    /// Throws away the session's questions, generates a fresh set and
    /// restarts the run.
    ///
    /// # Errors
    ///
    /// Returns an error when generation fails.
    pub async fn regenerate(
        &self,
        session: &mut PracticeSession,
    ) -> Result<(), SessionError> {
        let questions = self
            .content
            .regenerate(session.language(), session.level_id(), session.sublevel_id())
            .await?;
        session.replace_questions(questions)?;
        Ok(())
    }

    async fn complete(
        &self,
        session: &PracticeSession,
        score: u8,
        is_assessment: bool,
    ) -> Result<SessionSummary, SessionError> {
        self.progress
            .complete_sublevel(session.level_id(), session.sublevel_id(), score)
            .await?;
        let xp = scoring::session_xp(score, is_assessment, session.total_questions());
        self.progress.add_xp(xp).await?;
        Ok(SessionSummary {
            score,
            passed: true,
            completed: true,
            xp_awarded: xp,
            correct: session.correct_count(),
            total: session.total_questions(),
        })
    }
}

impl std::fmt::Debug for PracticeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticeService")
            .field("active_token", &self.active_token)
            .finish_non_exhaustive()
    }
}
