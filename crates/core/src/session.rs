use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::QuizSessionError;
use crate::model::{Question, QuestionId};

/// Streak length at which hosts celebrate the learner.
pub const STREAK_MILESTONE: u32 = 3;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where the session currently is.
///
/// There is no `Loading` phase on the type: a session only exists once its
/// questions are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Countdown running, learner may pick and submit an option.
    Answering,
    /// Result and explanation visible; waiting for `advance`.
    Revealed,
    /// Past the last question. Only read-only queries remain legal.
    Complete,
}

//
// ─── OUTPUT TYPES ──────────────────────────────────────────────────────────────
//

/// How a single question was resolved, by submission or timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    /// `None` when the countdown expired, even if an option was highlighted.
    pub chosen: Option<usize>,
    pub correct_index: usize,
    pub correct: bool,
    pub timed_out: bool,
    pub elapsed_seconds: u32,
    pub points_awarded: u32,
    /// Consecutive correct answers including this one.
    pub streak: u32,
    pub explanation: String,
}

/// Final tally, available once the session is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub score: u32,
    pub total_questions: u32,
    pub accuracy: f64,
    pub final_streak: u32,
    pub points_earned: u32,
    pub bookmarked: Vec<QuestionId>,
}

impl QuizSummary {
    /// Accuracy as a whole percentage, rounded half away from zero.
    #[must_use]
    pub fn score_percentage(&self) -> u32 {
        // accuracy is in [0, 1], so the product fits comfortably.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = (self.accuracy * 100.0).round() as u32;
        pct
    }
}

/// Position within the question list, for progress bars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    /// 1-based index of the question on screen.
    pub position: u32,
    pub total: u32,
    pub answered: u32,
    pub remaining: u32,
    pub percent_complete: u32,
    pub is_complete: bool,
}

/// State-change notification returned by every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    Ticked { remaining_seconds: u32 },
    TimedOut(AnswerOutcome),
    OptionSelected { index: usize },
    Answered(AnswerOutcome),
    BookmarkToggled { question_id: QuestionId, bookmarked: bool },
    Advanced { index: usize },
    Completed(QuizSummary),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One timed attempt over a fixed, ordered list of questions.
///
/// All mutation goes through the transition methods. Each returns the event
/// describing what changed, or an error that leaves the session untouched.
/// The countdown only moves when the host calls `tick`.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    time_per_question: u32,
    current: usize,
    selected: Option<usize>,
    phase: SessionPhase,
    remaining_seconds: u32,
    score: u32,
    streak: u32,
    points_earned: u32,
    bookmarked: BTreeSet<QuestionId>,
    answered: HashSet<QuestionId>,
    last_outcome: Option<AnswerOutcome>,
}

impl QuizSession {
    /// Begin a session at the first question with a full countdown.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::NoQuestions` for an empty list,
    /// `QuizSessionError::InvalidTimeLimit` for a zero budget, and
    /// `QuizSessionError::DuplicateQuestion` when ids repeat.
    pub fn start(questions: Vec<Question>, time_per_question: u32) -> Result<Self, QuizSessionError> {
        if questions.is_empty() {
            return Err(QuizSessionError::NoQuestions);
        }
        if time_per_question == 0 {
            return Err(QuizSessionError::InvalidTimeLimit);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        if !questions.iter().all(|q| seen.insert(q.id())) {
            return Err(QuizSessionError::DuplicateQuestion);
        }

        Ok(Self {
            questions,
            time_per_question,
            current: 0,
            selected: None,
            phase: SessionPhase::Answering,
            remaining_seconds: time_per_question,
            score: 0,
            streak: 0,
            points_earned: 0,
            bookmarked: BTreeSet::new(),
            answered: HashSet::new(),
            last_outcome: None,
        })
    }

    // ─── Transitions ───────────────────────────────────────────────────────────

    /// Count down one second. Expiry reveals the question as unanswered.
    ///
    /// Returns `None` when the session is not answering; ticks delivered
    /// after a reveal or completion are ignored.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        if self.phase != SessionPhase::Answering {
            return None;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return Some(SessionEvent::Ticked {
                remaining_seconds: self.remaining_seconds,
            });
        }

        let outcome = self.reveal(None);
        Some(SessionEvent::TimedOut(outcome))
    }

    /// Highlight an option for the current question. May be called repeatedly.
    ///
    /// # Errors
    ///
    /// `Completed` or `AlreadyRevealed` outside the answering phase;
    /// `OptionOutOfRange` for an index past the current question's options.
    pub fn select_option(&mut self, index: usize) -> Result<SessionEvent, QuizSessionError> {
        self.ensure_answering()?;
        let len = self.questions[self.current].option_count();
        if index >= len {
            return Err(QuizSessionError::OptionOutOfRange { index, len });
        }
        self.selected = Some(index);
        Ok(SessionEvent::OptionSelected { index })
    }

    /// Commit the highlighted option and reveal the result.
    ///
    /// # Errors
    ///
    /// `Completed` or `AlreadyRevealed` outside the answering phase;
    /// `NoSelection` when nothing is highlighted.
    pub fn submit(&mut self) -> Result<SessionEvent, QuizSessionError> {
        self.ensure_answering()?;
        let Some(chosen) = self.selected else {
            return Err(QuizSessionError::NoSelection);
        };
        if self.answered.contains(&self.questions[self.current].id()) {
            return Err(QuizSessionError::AlreadyRevealed);
        }

        let outcome = self.reveal(Some(chosen));
        Ok(SessionEvent::Answered(outcome))
    }

    /// Flip the bookmark on the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Completed` once the session is over.
    pub fn toggle_bookmark(&mut self) -> Result<SessionEvent, QuizSessionError> {
        if self.phase == SessionPhase::Complete {
            return Err(QuizSessionError::Completed);
        }
        let question_id = self.questions[self.current].id();
        let bookmarked = if self.bookmarked.remove(&question_id) {
            false
        } else {
            self.bookmarked.insert(question_id)
        };
        Ok(SessionEvent::BookmarkToggled {
            question_id,
            bookmarked,
        })
    }

    /// Move past a revealed question, or complete the session after the last one.
    ///
    /// # Errors
    ///
    /// `NotRevealed` while answering; `Completed` once the session is over.
    pub fn advance(&mut self) -> Result<SessionEvent, QuizSessionError> {
        match self.phase {
            SessionPhase::Complete => return Err(QuizSessionError::Completed),
            SessionPhase::Answering => return Err(QuizSessionError::NotRevealed),
            SessionPhase::Revealed => {}
        }

        if self.current + 1 >= self.questions.len() {
            self.phase = SessionPhase::Complete;
            self.selected = None;
            return Ok(SessionEvent::Completed(self.build_summary()));
        }

        self.current += 1;
        self.selected = None;
        self.remaining_seconds = self.time_per_question;
        self.phase = SessionPhase::Answering;
        Ok(SessionEvent::Advanced {
            index: self.current,
        })
    }

    /// Final tally.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::NotComplete` while questions remain.
    pub fn summary(&self) -> Result<QuizSummary, QuizSessionError> {
        if self.phase != SessionPhase::Complete {
            return Err(QuizSessionError::NotComplete);
        }
        Ok(self.build_summary())
    }

    // ─── Queries ───────────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.phase == SessionPhase::Revealed
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    /// The question on screen; `None` once complete.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_complete() {
            return None;
        }
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn time_per_question(&self) -> u32 {
        self.time_per_question
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn streak_milestone(&self) -> bool {
        self.streak >= STREAK_MILESTONE
    }

    #[must_use]
    pub fn points_earned(&self) -> u32 {
        self.points_earned
    }

    #[must_use]
    pub fn bookmarked(&self) -> &BTreeSet<QuestionId> {
        &self.bookmarked
    }

    #[must_use]
    pub fn is_bookmarked(&self, id: QuestionId) -> bool {
        self.bookmarked.contains(&id)
    }

    #[must_use]
    pub fn is_answered(&self, id: QuestionId) -> bool {
        self.answered.contains(&id)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answered.len()
    }

    /// Outcome of the most recent reveal, if any.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&AnswerOutcome> {
        self.last_outcome.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = count_u32(self.questions.len());
        let answered = count_u32(self.answered.len());
        let position = if self.is_complete() {
            total
        } else {
            count_u32(self.current + 1)
        };
        SessionProgress {
            position,
            total,
            answered,
            remaining: total.saturating_sub(answered),
            percent_complete: position.saturating_mul(100) / total.max(1),
            is_complete: self.is_complete(),
        }
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    fn ensure_answering(&self) -> Result<(), QuizSessionError> {
        match self.phase {
            SessionPhase::Answering => Ok(()),
            SessionPhase::Revealed => Err(QuizSessionError::AlreadyRevealed),
            SessionPhase::Complete => Err(QuizSessionError::Completed),
        }
    }

    /// Score the current question and switch to `Revealed`. `None` means timeout.
    fn reveal(&mut self, chosen: Option<usize>) -> AnswerOutcome {
        let question = &self.questions[self.current];
        let correct = chosen.is_some_and(|i| question.is_correct(i));
        let points_awarded = if correct { question.points() } else { 0 };

        if correct {
            self.score = self.score.saturating_add(1);
            self.streak = self.streak.saturating_add(1);
            self.points_earned = self.points_earned.saturating_add(points_awarded);
        } else {
            self.streak = 0;
        }
        self.answered.insert(question.id());
        self.phase = SessionPhase::Revealed;

        let outcome = AnswerOutcome {
            question_id: question.id(),
            chosen,
            correct_index: question.correct_index(),
            correct,
            timed_out: chosen.is_none(),
            elapsed_seconds: self.time_per_question - self.remaining_seconds,
            points_awarded,
            streak: self.streak,
            explanation: question.explanation().to_string(),
        };
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    fn build_summary(&self) -> QuizSummary {
        let total_questions = count_u32(self.questions.len());
        QuizSummary {
            score: self.score,
            total_questions,
            accuracy: f64::from(self.score) / f64::from(total_questions.max(1)),
            final_streak: self.streak,
            points_earned: self.points_earned,
            bookmarked: self.bookmarked.iter().copied().collect(),
        }
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
