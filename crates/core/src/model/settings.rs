use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::catalog::{Difficulty, Topic};

/// Countdown budget per question when the caller does not pick one.
pub const DEFAULT_TIME_PER_QUESTION_SECS: u32 = 120;

/// Upper bound on the per-question countdown.
pub const MAX_TIME_PER_QUESTION_SECS: u32 = 3600;

/// Number of questions requested from the provider by default.
pub const DEFAULT_QUESTION_LIMIT: u32 = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("time per question must be between 1 and {MAX_TIME_PER_QUESTION_SECS} seconds, got {0}")]
    InvalidTimePerQuestion(u32),

    #[error("question limit must be > 0")]
    InvalidQuestionLimit,
}

/// Caller-supplied parameters for a single quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSettings {
    topic: Topic,
    difficulty: Difficulty,
    time_per_question: u32,
    question_limit: u32,
}

impl QuizSettings {
    /// Settings with the default time budget and question limit.
    #[must_use]
    pub fn new(topic: Topic, difficulty: Difficulty) -> Self {
        Self {
            topic,
            difficulty,
            time_per_question: DEFAULT_TIME_PER_QUESTION_SECS,
            question_limit: DEFAULT_QUESTION_LIMIT,
        }
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidTimePerQuestion` outside `1..=MAX_TIME_PER_QUESTION_SECS`.
    pub fn with_time_per_question(mut self, seconds: u32) -> Result<Self, SettingsError> {
        if !(1..=MAX_TIME_PER_QUESTION_SECS).contains(&seconds) {
            return Err(SettingsError::InvalidTimePerQuestion(seconds));
        }
        self.time_per_question = seconds;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidQuestionLimit` when `limit` is zero.
    pub fn with_question_limit(mut self, limit: u32) -> Result<Self, SettingsError> {
        if limit == 0 {
            return Err(SettingsError::InvalidQuestionLimit);
        }
        self.question_limit = limit;
        Ok(self)
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    #[must_use]
    pub fn time_per_question(&self) -> u32 {
        self.time_per_question
    }

    #[must_use]
    pub fn question_limit(&self) -> u32 {
        self.question_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> QuizSettings {
        QuizSettings::new(Topic::new("rust").unwrap(), Difficulty::new("easy").unwrap())
    }

    #[test]
    fn defaults_match_dashboard() {
        let s = base();
        assert_eq!(s.time_per_question(), 120);
        assert_eq!(s.question_limit(), 15);
    }

    #[test]
    fn rejects_zero_and_oversized_timer() {
        assert_eq!(
            base().with_time_per_question(0).unwrap_err(),
            SettingsError::InvalidTimePerQuestion(0)
        );
        assert!(base().with_time_per_question(3601).is_err());
        assert_eq!(base().with_time_per_question(30).unwrap().time_per_question(), 30);
    }

    #[test]
    fn rejects_zero_limit() {
        assert_eq!(
            base().with_question_limit(0).unwrap_err(),
            SettingsError::InvalidQuestionLimit
        );
    }
}
