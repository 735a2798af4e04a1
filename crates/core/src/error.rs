use thiserror::Error;

/// Broad classification of session failures.
///
/// Both kinds signal a host integration bug; neither is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed arguments to an operation.
    InvalidInput,
    /// Operation is illegal in the session's current state.
    InvalidState,
}

/// Errors returned by `QuizSession` transitions. A failed call never mutates the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("a session needs at least one question")]
    NoQuestions,

    #[error("time per question must be > 0")]
    InvalidTimeLimit,

    #[error("option {index} is out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },

    #[error("question ids must be unique within a session")]
    DuplicateQuestion,

    #[error("the current question has already been revealed")]
    AlreadyRevealed,

    #[error("no option selected")]
    NoSelection,

    #[error("the current question has not been revealed yet")]
    NotRevealed,

    #[error("session already completed")]
    Completed,

    #[error("session is still in progress")]
    NotComplete,
}

impl QuizSessionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoQuestions
            | Self::InvalidTimeLimit
            | Self::OptionOutOfRange { .. }
            | Self::DuplicateQuestion => ErrorKind::InvalidInput,
            Self::AlreadyRevealed
            | Self::NoSelection
            | Self::NotRevealed
            | Self::Completed
            | Self::NotComplete => ErrorKind::InvalidState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_classified() {
        assert_eq!(QuizSessionError::NoQuestions.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            QuizSessionError::OptionOutOfRange { index: 4, len: 4 }.kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(QuizSessionError::NoSelection.kind(), ErrorKind::InvalidState);
        assert_eq!(QuizSessionError::Completed.kind(), ErrorKind::InvalidState);
    }
}
