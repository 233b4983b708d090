use lingua_core::scoring;

use crate::practice::PracticeSession;

/// How a finished session turns into a 0-100 score.
pub trait ScorePolicy: Send + Sync {
    fn session_score(&self, session: &PracticeSession) -> u8;
}

/// Completion-based scoring: finishing the run awards a fixed score no
/// matter how the questions were answered. Practice sublevels use this
/// with the full score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedScore(pub u8);

impl FixedScore {
    pub const COMPLETION: Self = Self(100);
}

impl ScorePolicy for FixedScore {
    fn session_score(&self, _session: &PracticeSession) -> u8 {
        self.0.min(100)
    }
}

/// Accuracy-based scoring: the rounded share of correct answers over
/// every question in the session. Assessments are graded with this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccuracyScore;

impl ScorePolicy for AccuracyScore {
    fn session_score(&self, session: &PracticeSession) -> u8 {
        scoring::session_score(session.correct_count(), session.total_questions())
    }
}
