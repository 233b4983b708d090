use chrono::{DateTime, Utc};
use lingua_core::model::{LanguageCode, LevelId, Question, SublevelId};

use crate::error::SessionError;
use crate::practice::SessionSummary;

/// Result of one advance step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved to the question at this index.
    Moved(usize),
    /// The last question was passed; the session is complete.
    Completed,
}

/// Counters for rendering a session's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeProgress {
    pub total: usize,
    pub viewed: usize,
    pub answered: usize,
    pub correct: usize,
    pub is_complete: bool,
}

/// A run through one sublevel's questions.
///
/// Pure state: no storage or network access happens here. Movement is
/// gated on viewing, so a question must be seen (flashcards) or answered
/// (everything else) before the session moves past it. Advancing past
/// the last question completes the session; results are written back by
/// the practice workflow, not by this type.
pub struct PracticeSession {
    language: LanguageCode,
    level_id: LevelId,
    sublevel_id: SublevelId,
    is_assessment: bool,
    skills: Vec<String>,
    questions: Vec<Question>,
    current: usize,
    viewed: Vec<bool>,
    answers: Vec<Option<bool>>,
    token: u64,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    summary: Option<SessionSummary>,
}

impl PracticeSession {
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when no questions are given.
    pub fn new(
        language: LanguageCode,
        level_id: LevelId,
        sublevel_id: SublevelId,
        is_assessment: bool,
        skills: Vec<String>,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let count = questions.len();
        Ok(Self {
            language,
            level_id,
            sublevel_id,
            is_assessment,
            skills,
            questions,
            current: 0,
            viewed: vec![false; count],
            answers: vec![None; count],
            token: 0,
            started_at,
            completed_at: None,
            summary: None,
        })
    }

    #[must_use]
    pub(crate) fn with_token(mut self, token: u64) -> Self {
        self.token = token;
        self
    }

    // ─── Mutations ─────────────────────────────────────────────────────────

    /// Marks the current question as seen, which is what unlocks
    /// advancing past it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is done.
    pub fn mark_viewed(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.viewed[self.current] = true;
        Ok(())
    }

    /// Grades a choice against the current multiple-choice question and
    /// records the result.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is complete, the current
    /// question takes a different answer form, or it was already
    /// answered.
    pub fn submit_choice(&mut self, index: usize) -> Result<bool, SessionError> {
        self.ensure_active()?;
        let correct = self.questions[self.current]
            .is_correct_choice(index)
            .ok_or(SessionError::AnswerMismatch)?;
        self.record_answer(correct)?;
        Ok(correct)
    }

    /// Grades a typed answer against the current fill-in-the-blank
    /// question and records the result.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is complete, the current
    /// question takes a different answer form, or it was already
    /// answered.
    pub fn submit_text(&mut self, input: &str) -> Result<bool, SessionError> {
        self.ensure_active()?;
        let correct = self.questions[self.current]
            .is_correct_text(input)
            .ok_or(SessionError::AnswerMismatch)?;
        self.record_answer(correct)?;
        Ok(correct)
    }

    /// Moves to the next question, or completes the session when the
    /// current one is the last.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotViewed` while the current question has
    /// not been seen, and `SessionError::Completed` once done.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<StepOutcome, SessionError> {
        self.ensure_active()?;
        if !self.viewed[self.current] {
            return Err(SessionError::NotViewed);
        }
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            Ok(StepOutcome::Moved(self.current))
        } else {
            self.completed_at = Some(now);
            Ok(StepOutcome::Completed)
        }
    }

    /// Steps back one question, staying put at the first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is done.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_active()?;
        self.current = self.current.saturating_sub(1);
        Ok(self.current)
    }

    /// Swaps in a fresh question set and restarts from the beginning,
    /// keeping the session's identity.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when no questions are given.
    pub fn replace_questions(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let count = questions.len();
        self.questions = questions;
        self.current = 0;
        self.viewed = vec![false; count];
        self.answers = vec![None; count];
        self.completed_at = None;
        self.summary = None;
        Ok(())
    }

    fn record_answer(&mut self, correct: bool) -> Result<(), SessionError> {
        if self.answers[self.current].is_some() {
            return Err(SessionError::AlreadyAnswered);
        }
        self.answers[self.current] = Some(correct);
        self.viewed[self.current] = true;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        Ok(())
    }

    pub(crate) fn set_summary(&mut self, summary: SessionSummary) {
        self.summary = Some(summary);
    }

    // ─── Queries ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn language(&self) -> &LanguageCode {
        &self.language
    }

    #[must_use]
    pub fn level_id(&self) -> &LevelId {
        &self.level_id
    }

    #[must_use]
    pub fn sublevel_id(&self) -> &SublevelId {
        &self.sublevel_id
    }

    #[must_use]
    pub fn is_assessment(&self) -> bool {
        self.is_assessment
    }

    #[must_use]
    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_current_viewed(&self) -> bool {
        self.viewed.get(self.current).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn viewed_count(&self) -> usize {
        self.viewed.iter().filter(|seen| **seen).count()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().flatten().count()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.answers.iter().flatten().filter(|ok| **ok).count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn summary(&self) -> Option<SessionSummary> {
        self.summary
    }

    pub(crate) fn token(&self) -> u64 {
        self.token
    }

    #[must_use]
    pub fn progress(&self) -> PracticeProgress {
        PracticeProgress {
            total: self.questions.len(),
            viewed: self.viewed_count(),
            answered: self.answered_count(),
            correct: self.correct_count(),
            is_complete: self.is_complete(),
        }
    }
}

impl std::fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticeSession")
            .field("language", &self.language)
            .field("level_id", &self.level_id)
            .field("sublevel_id", &self.sublevel_id)
            .field("current", &self.current)
            .field("total", &self.questions.len())
            .field("is_complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::Phrase;
    use lingua_core::time::fixed_now;

    fn phrase(text: &str, gloss: &str) -> Phrase {
        Phrase::new(text, gloss).expect("phrase")
    }

    fn questions() -> Vec<Question> {
        vec![
            Question::mcq(
                phrase("¿como estas?", "how are you?"),
                vec![phrase("bien", "well"), phrase("pan", "bread")],
                0,
            )
            .expect("mcq"),
            Question::flashcard(phrase("hola", "hello"), phrase("adios", "goodbye")),
            Question::fill_blank(phrase("yo ___ pan", "I eat bread"), phrase("como", "eat")),
        ]
    }

    fn session() -> PracticeSession {
        PracticeSession::new(
            "es".parse().expect("code"),
            "level-1".parse().expect("level"),
            "foundation-vocab".parse().expect("sublevel"),
            false,
            vec!["vocabulary".into()],
            questions(),
            fixed_now(),
        )
        .expect("session")
    }

    #[test]
    fn a_session_needs_questions() {
        let result = PracticeSession::new(
            "es".parse().expect("code"),
            "level-1".parse().expect("level"),
            "foundation-vocab".parse().expect("sublevel"),
            false,
            Vec::new(),
            Vec::new(),
            fixed_now(),
        );
        assert!(matches!(result, Err(SessionError::Empty)));
    }

    #[test]
    fn advancing_requires_viewing_first() {
        let mut session = session();
        assert!(matches!(
            session.advance(fixed_now()),
            Err(SessionError::NotViewed)
        ));

        session.mark_viewed().expect("view");
        assert_eq!(
            session.advance(fixed_now()).expect("advance"),
            StepOutcome::Moved(1)
        );
    }

    #[test]
    fn answering_counts_as_viewing() {
        let mut session = session();
        assert!(session.submit_choice(0).expect("answer"));
        assert!(session.is_current_viewed());
        assert_eq!(
            session.advance(fixed_now()).expect("advance"),
            StepOutcome::Moved(1)
        );
    }

    #[test]
    fn questions_lock_after_the_first_answer() {
        let mut session = session();
        session.submit_choice(1).expect("answer");
        assert!(matches!(
            session.submit_choice(0),
            Err(SessionError::AlreadyAnswered)
        ));
    }

    #[test]
    fn answer_form_must_match_the_question() {
        let mut session = session();
        assert!(matches!(
            session.submit_text("bien"),
            Err(SessionError::AnswerMismatch)
        ));
    }

    #[test]
    fn advancing_past_the_last_question_completes() {
        let mut session = session();
        session.submit_choice(0).expect("mcq");
        session.advance(fixed_now()).expect("advance");
        session.mark_viewed().expect("flashcard");
        session.advance(fixed_now()).expect("advance");
        assert!(session.submit_text("  COMO ").expect("fill blank"));
        assert_eq!(
            session.advance(fixed_now()).expect("advance"),
            StepOutcome::Completed
        );

        assert!(session.is_complete());
        assert_eq!(session.correct_count(), 2);
        assert_eq!(session.answered_count(), 2);
        assert!(matches!(
            session.advance(fixed_now()),
            Err(SessionError::Completed)
        ));
        assert!(matches!(session.mark_viewed(), Err(SessionError::Completed)));
    }

    #[test]
    fn previous_stays_at_the_first_question() {
        let mut session = session();
        assert_eq!(session.previous().expect("previous"), 0);
        session.mark_viewed().expect("view");
        session.advance(fixed_now()).expect("advance");
        assert_eq!(session.previous().expect("previous"), 0);
        // Going back does not clear what was already seen.
        assert!(session.is_current_viewed());
    }

    #[test]
    fn replacing_questions_restarts_the_run() {
        let mut session = session();
        session.submit_choice(0).expect("answer");
        session.advance(fixed_now()).expect("advance");

        session.replace_questions(questions()).expect("replace");
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answered_count(), 0);
        assert!(!session.is_complete());
        assert!(!session.is_current_viewed());
    }

    #[test]
    fn progress_counts_track_the_run() {
        let mut session = session();
        session.submit_choice(1).expect("answer");
        session.advance(fixed_now()).expect("advance");
        session.mark_viewed().expect("view");

        let progress = session.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.viewed, 2);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.correct, 0);
        assert!(!progress.is_complete);
    }
}
