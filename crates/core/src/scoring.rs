//! Pure scoring rules shared by the session workflow and question checks.

/// Score a checkpoint must reach to count as passed.
pub const PASSING_SCORE: u8 = 80;

/// Normalizes a typed answer for comparison: trimmed and lowercased.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Compares answers ignoring case and surrounding whitespace, so that
/// "hola" is accepted where the content says "Hola".
#[must_use]
pub fn answer_matches(expected: &str, given: &str) -> bool {
    normalize_answer(expected) == normalize_answer(given)
}

/// Overall session score as a rounded percentage. Zero questions score
/// zero rather than dividing by zero.
#[must_use]
pub fn session_score(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u8
}

#[must_use]
pub fn checkpoint_passed(score: u8, passing_score: u8) -> bool {
    score >= passing_score
}

/// Experience points earned by a finished session.
///
/// Assessments pay a higher base, perfect and near-perfect runs earn a
/// bonus, and longer sessions multiply the total (one step per five
/// questions).
#[must_use]
pub fn session_xp(score: u8, is_assessment: bool, question_count: usize) -> u32 {
    let base: u32 = if is_assessment { 50 } else { 10 };
    let bonus: u32 = if score == 100 {
        if is_assessment { 50 } else { 20 }
    } else if score >= 90 {
        if is_assessment { 25 } else { 10 }
    } else {
        0
    };
    let multiplier = (question_count / 5).max(1) as u32;
    (base + bonus) * multiplier
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
