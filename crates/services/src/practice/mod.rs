//! Practice sessions: a pure per-question state machine plus the
//! workflow that scores completed runs and writes them into progress.

mod policy;
mod session;
mod workflow;

pub use policy::{AccuracyScore, FixedScore, ScorePolicy};
pub use session::{PracticeProgress, PracticeSession, StepOutcome};
pub use workflow::{PracticeService, SessionSummary};
