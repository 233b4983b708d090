use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring;

/// Error produced when question content fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("phrase text cannot be blank")]
    BlankText,
    #[error("phrase gloss cannot be blank")]
    BlankGloss,
    #[error("multiple choice question needs at least two options, got {0}")]
    TooFewOptions(usize),
    #[error("correct option index {index} is out of range for {options} options")]
    CorrectIndexOutOfRange { index: usize, options: usize },
}

/// A piece of target-language text paired with its English gloss.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    text: String,
    #[serde(rename = "en")]
    gloss: String,
}

impl Phrase {
    /// Creates a phrase, trimming both sides.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if either side is blank after trimming.
    pub fn new(text: impl Into<String>, gloss: impl Into<String>) -> Result<Self, QuestionError> {
        let text = text.into().trim().to_owned();
        let gloss = gloss.into().trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::BlankText);
        }
        if gloss.is_empty() {
            return Err(QuestionError::BlankGloss);
        }
        Ok(Self { text, gloss })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn gloss(&self) -> &str {
        &self.gloss
    }
}

/// One exercise item, in the same shape the generation backend emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    #[serde(rename_all = "camelCase")]
    Mcq {
        question: Phrase,
        options: Vec<Phrase>,
        correct_index: usize,
    },
    Flashcard {
        front: Phrase,
        back: Phrase,
    },
    FillBlank {
        sentence: Phrase,
        answer: Phrase,
    },
}

impl Question {
    /// Builds a multiple choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if fewer than two options are given or the
    /// correct index points outside them.
    pub fn mcq(
        question: Phrase,
        options: Vec<Phrase>,
        correct_index: usize,
    ) -> Result<Self, QuestionError> {
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                options: options.len(),
            });
        }
        Ok(Self::Mcq {
            question,
            options,
            correct_index,
        })
    }

    #[must_use]
    pub fn flashcard(front: Phrase, back: Phrase) -> Self {
        Self::Flashcard { front, back }
    }

    #[must_use]
    pub fn fill_blank(sentence: Phrase, answer: Phrase) -> Self {
        Self::FillBlank { sentence, answer }
    }

    /// Re-checks the structural invariants after deserialization.
    /// Payloads from the cache or the network are not trusted to have
    /// gone through the constructors.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if an invariant does not hold.
    pub fn validate(&self) -> Result<(), QuestionError> {
        match self {
            Self::Mcq {
                options,
                correct_index,
                ..
            } => {
                if options.len() < 2 {
                    return Err(QuestionError::TooFewOptions(options.len()));
                }
                if *correct_index >= options.len() {
                    return Err(QuestionError::CorrectIndexOutOfRange {
                        index: *correct_index,
                        options: options.len(),
                    });
                }
                Ok(())
            }
            Self::Flashcard { .. } | Self::FillBlank { .. } => Ok(()),
        }
    }

    /// Checks a chosen option index. `None` for non-choice questions.
    #[must_use]
    pub fn is_correct_choice(&self, index: usize) -> Option<bool> {
        match self {
            Self::Mcq { correct_index, .. } => Some(index == *correct_index),
            _ => None,
        }
    }

    /// Checks a typed answer, ignoring case and surrounding whitespace.
    /// `None` for questions without a typed answer.
    #[must_use]
    pub fn is_correct_text(&self, input: &str) -> Option<bool> {
        match self {
            Self::FillBlank { answer, .. } => {
                Some(scoring::answer_matches(answer.text(), input))
            }
            _ => None,
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn phrase(text: &str, gloss: &str) -> Phrase {
        Phrase::new(text, gloss).unwrap()
    }

    #[test]
    fn phrase_trims_and_rejects_blank_sides() {
        let p = phrase(" Hola ", " Hello ");
        assert_eq!(p.text(), "Hola");
        assert_eq!(p.gloss(), "Hello");

        assert_eq!(Phrase::new("  ", "Hello"), Err(QuestionError::BlankText));
        assert_eq!(Phrase::new("Hola", ""), Err(QuestionError::BlankGloss));
    }

    #[test]
    fn mcq_constructor_checks_the_correct_index() {
        let options = vec![phrase("uno", "one"), phrase("dos", "two")];
        assert!(Question::mcq(phrase("1", "one"), options.clone(), 1).is_ok());

        let err = Question::mcq(phrase("1", "one"), options, 2).unwrap_err();
        assert_eq!(
            err,
            QuestionError::CorrectIndexOutOfRange { index: 2, options: 2 }
        );
    }

    #[test]
    fn mcq_needs_at_least_two_options() {
        let err = Question::mcq(phrase("1", "one"), vec![phrase("uno", "one")], 0).unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions(1));
    }

    #[test]
    fn fill_blank_accepts_case_and_whitespace_variants() {
        let q = Question::fill_blank(phrase("___ means hello", "greeting"), phrase("Hola", "hello"));

        assert_eq!(q.is_correct_text("hola"), Some(true));
        assert_eq!(q.is_correct_text("  HOLA "), Some(true));
        assert_eq!(q.is_correct_text("adios"), Some(false));
        assert_eq!(q.is_correct_choice(0), None);
    }

    #[test]
    fn wire_format_uses_snake_case_tags() {
        let q = Question::fill_blank(phrase("Me ___ Ana", "My name is Ana"), phrase("llamo", "call"));
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains(r#""type":"fill_blank""#));
        assert!(json.contains(r#""en":"call""#));

        let back: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn mcq_wire_format_round_trips() {
        let q = Question::mcq(
            phrase("¿Cómo se dice 'thanks'?", "How do you say 'thanks'?"),
            vec![phrase("gracias", "thanks"), phrase("hola", "hello")],
            0,
        )
        .unwrap();
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains(r#""type":"mcq""#));
        assert!(json.contains(r#""correctIndex":0"#));

        let back: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn validate_catches_deserialized_out_of_range_index() {
        let json = r#"{
            "type": "mcq",
            "question": {"text": "uno", "en": "one"},
            "options": [{"text": "a", "en": "a"}, {"text": "b", "en": "b"}],
            "correctIndex": 9
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert!(q.validate().is_err());
    }
}
