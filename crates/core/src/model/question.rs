use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Reward for a correct answer when the question does not specify one.
pub const DEFAULT_POINTS: u32 = 10;

/// Explanation shown after answering when the question does not carry one.
pub const DEFAULT_EXPLANATION: &str = "No explanation available.";

/// Minimum number of options a multiple-choice question must offer.
pub const MIN_OPTIONS: usize = 2;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least {MIN_OPTIONS} options, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {order} has empty text")]
    EmptyOptionText { order: u32 },

    #[error("option order must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguousOrder { expected: u32, found: u32 },

    #[error("correct option index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },

    #[error("points must be > 0")]
    ZeroPoints,
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// One selectable answer. `order` is 1-based and matches the option's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub order: u32,
    pub text: String,
}

/// Option as stored by a backend: unordered, with a correctness flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDraft {
    pub order: u32,
    pub text: String,
    pub is_correct: bool,
}

impl OptionDraft {
    #[must_use]
    pub fn new(order: u32, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            order,
            text: text.into(),
            is_correct,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Multiple-choice question, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    code_snippet: Option<String>,
    options: Vec<AnswerOption>,
    correct_index: usize,
    explanation: String,
    points: u32,
}

impl Question {
    /// Build a question from option texts listed in display order.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text or options are empty, fewer than
    /// `MIN_OPTIONS` options are given, `correct_index` is out of range, or
    /// `points` is `Some(0)`.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: Option<String>,
        points: Option<u32>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: options.len(),
            });
        }
        if points == Some(0) {
            return Err(QuestionError::ZeroPoints);
        }

        let mut ordered = Vec::with_capacity(options.len());
        for (order, text) in (1_u32..).zip(options) {
            if text.trim().is_empty() {
                return Err(QuestionError::EmptyOptionText { order });
            }
            ordered.push(AnswerOption { order, text });
        }

        Ok(Self {
            id,
            text,
            code_snippet: None,
            options: ordered,
            correct_index,
            explanation: normalize_explanation(explanation),
            points: points.unwrap_or(DEFAULT_POINTS),
        })
    }

    /// Rehydrate a question from backend rows.
    ///
    /// Options are sorted by `order`, which must then run 1..=n. The correct
    /// index is taken from the first flagged option and falls back to 0 when
    /// no option is flagged. Missing or non-positive points fall back to
    /// `DEFAULT_POINTS`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text is empty, the option set is too
    /// small, an option is blank, or the orders have gaps or duplicates.
    pub fn from_persisted(
        id: QuestionId,
        text: impl Into<String>,
        code_snippet: Option<String>,
        mut options: Vec<OptionDraft>,
        explanation: Option<String>,
        points: Option<i64>,
    ) -> Result<Self, QuestionError> {
        options.sort_by_key(|o| o.order);

        for (expected, option) in (1_u32..).zip(&options) {
            if option.order != expected {
                return Err(QuestionError::NonContiguousOrder {
                    expected,
                    found: option.order,
                });
            }
        }

        let correct_index = options.iter().position(|o| o.is_correct).unwrap_or(0);
        let points = points
            .and_then(|p| u32::try_from(p).ok())
            .filter(|p| *p > 0);

        let question = Self::new(
            id,
            text,
            options.into_iter().map(|o| o.text).collect(),
            correct_index,
            explanation,
            points,
        )?;
        Ok(question.with_code_snippet(code_snippet))
    }

    /// Attach an optional code snippet shown alongside the prompt.
    #[must_use]
    pub fn with_code_snippet(mut self, snippet: Option<String>) -> Self {
        self.code_snippet = snippet.filter(|s| !s.trim().is_empty());
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn code_snippet(&self) -> Option<&str> {
        self.code_snippet.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_index
    }
}

fn normalize_explanation(explanation: Option<String>) -> String {
    explanation
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(texts: &[&str]) -> Vec<String> {
        texts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn new_assigns_contiguous_orders_and_defaults() {
        let q = Question::new(
            QuestionId::random(),
            "What does `let` do?",
            opts(&["binds", "loops", "panics"]),
            0,
            None,
            None,
        )
        .unwrap();

        let orders: Vec<u32> = q.options().iter().map(|o| o.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(q.points(), DEFAULT_POINTS);
        assert_eq!(q.explanation(), DEFAULT_EXPLANATION);
    }

    #[test]
    fn new_rejects_out_of_range_correct_index() {
        let err = Question::new(QuestionId::random(), "Q", opts(&["a", "b"]), 2, None, None)
            .unwrap_err();
        assert_eq!(err, QuestionError::CorrectIndexOutOfRange { index: 2, len: 2 });
    }

    #[test]
    fn new_rejects_single_option_and_zero_points() {
        let err =
            Question::new(QuestionId::random(), "Q", opts(&["a"]), 0, None, None).unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { len: 1 });

        let err = Question::new(QuestionId::random(), "Q", opts(&["a", "b"]), 0, None, Some(0))
            .unwrap_err();
        assert_eq!(err, QuestionError::ZeroPoints);
    }

    #[test]
    fn from_persisted_sorts_options_and_finds_correct_one() {
        let q = Question::from_persisted(
            QuestionId::random(),
            "Which keyword declares a constant?",
            Some("const X: u8 = 1;".into()),
            vec![
                OptionDraft::new(3, "static", false),
                OptionDraft::new(1, "let", false),
                OptionDraft::new(2, "const", true),
            ],
            Some("`const` is inlined at every use.".into()),
            Some(25),
        )
        .unwrap();

        assert_eq!(q.options()[0].text, "let");
        assert_eq!(q.correct_index(), 1);
        assert_eq!(q.points(), 25);
        assert_eq!(q.code_snippet(), Some("const X: u8 = 1;"));
    }

    #[test]
    fn from_persisted_falls_back_when_nothing_is_flagged() {
        let q = Question::from_persisted(
            QuestionId::random(),
            "Q",
            None,
            vec![OptionDraft::new(1, "a", false), OptionDraft::new(2, "b", false)],
            Some("   ".into()),
            Some(-5),
        )
        .unwrap();

        assert_eq!(q.correct_index(), 0);
        assert_eq!(q.points(), DEFAULT_POINTS);
        assert_eq!(q.explanation(), DEFAULT_EXPLANATION);
    }

    #[test]
    fn from_persisted_rejects_gaps_in_order() {
        let err = Question::from_persisted(
            QuestionId::random(),
            "Q",
            None,
            vec![OptionDraft::new(1, "a", true), OptionDraft::new(3, "b", false)],
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            QuestionError::NonContiguousOrder {
                expected: 2,
                found: 3
            }
        );
    }
}
