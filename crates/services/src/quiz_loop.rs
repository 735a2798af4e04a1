use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptId, QuizSettings, UserProfile};
use quiz_core::{AnswerOutcome, QuizSession, QuizSessionError, QuizSummary, SessionEvent};
use rand::rng;
use rand::seq::SliceRandom;
use storage::repository::{
    AttemptRecorder, AttemptResult, IdentityProvider, NewAttempt, QuestionProvider,
    ResponseRecord, StorageError,
};

use crate::Clock;
use crate::error::QuizServiceError;

/// Upper bound on a single persistence call made while a quiz is running.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(3);

/// Starts quizzes: resolves the learner, loads questions and opens an attempt.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<dyn QuestionProvider>,
    attempts: Arc<dyn AttemptRecorder>,
    identity: Arc<dyn IdentityProvider>,
    shuffle: bool,
    write_timeout: Duration,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionProvider>,
        attempts: Arc<dyn AttemptRecorder>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            clock,
            questions,
            attempts,
            identity,
            shuffle: false,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// How long attempt and profile writes may take before they are abandoned.
    #[must_use]
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Start a quiz for the signed-in learner.
    ///
    /// The attempt row is created after the session starts; if that write
    /// fails the quiz still runs, just without persisted responses.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when nobody is signed in, `NoQuestions` when the
    /// catalog entry is unknown or empty, `Storage` for backend failures.
    pub async fn start_quiz(&self, settings: &QuizSettings) -> Result<ActiveQuiz, QuizServiceError> {
        let user = self
            .identity
            .current_user()
            .await?
            .ok_or(QuizServiceError::Unauthenticated)?;

        let mut questions = match self
            .questions
            .fetch(
                settings.topic(),
                settings.difficulty(),
                settings.question_limit(),
            )
            .await
        {
            Ok(questions) => questions,
            Err(StorageError::NotFound) => return Err(QuizServiceError::NoQuestions),
            Err(err) => return Err(err.into()),
        };
        if questions.is_empty() {
            return Err(QuizServiceError::NoQuestions);
        }
        if self.shuffle {
            questions.shuffle(&mut rng());
        }

        let session = QuizSession::start(questions, settings.time_per_question())?;
        let started_at = self.clock.now();
        let total_questions = u32::try_from(session.total_questions()).unwrap_or(u32::MAX);

        let attempt = NewAttempt {
            user_id: user.id,
            topic: settings.topic().clone(),
            difficulty: settings.difficulty().clone(),
            total_questions,
            started_at,
        };
        let attempt_id = bounded_write(
            self.write_timeout,
            "create quiz attempt",
            self.attempts.create_attempt(&attempt),
        )
        .await;
        if attempt_id.is_none() {
            log::warn!("continuing quiz unrecorded");
        }

        log::info!(
            "started {}/{} quiz with {total_questions} questions for {}",
            settings.topic(),
            settings.difficulty(),
            user.display_name
        );

        Ok(ActiveQuiz {
            session,
            settings: settings.clone(),
            user,
            attempt_id,
            started_at,
            clock: self.clock,
            attempts: Arc::clone(&self.attempts),
            identity: Arc::clone(&self.identity),
            write_timeout: self.write_timeout,
        })
    }
}

/// A running quiz together with its persistence bookkeeping.
///
/// Transitions forward to the wrapped `QuizSession`. Reveals record a
/// response and completion finalizes the attempt and credits the profile.
/// Those writes are best-effort: failures and timeouts are logged and the
/// in-memory session is never affected.
pub struct ActiveQuiz {
    session: QuizSession,
    settings: QuizSettings,
    user: UserProfile,
    attempt_id: Option<AttemptId>,
    started_at: DateTime<Utc>,
    clock: Clock,
    attempts: Arc<dyn AttemptRecorder>,
    identity: Arc<dyn IdentityProvider>,
    write_timeout: Duration,
}

impl ActiveQuiz {
    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Learner profile, including rewards once the quiz has completed.
    #[must_use]
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// `None` when the attempt could not be created.
    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Advance the wall clock used for attempt timestamps. Only affects fixed clocks.
    pub fn advance_clock(&mut self, delta: chrono::Duration) {
        self.clock.advance(delta);
    }

    /// One second of countdown; a timeout is recorded as an unanswered response.
    pub async fn tick(&mut self) -> Option<SessionEvent> {
        let event = self.session.tick()?;
        if let SessionEvent::TimedOut(outcome) = &event {
            self.record_response(outcome).await;
        }
        Some(event)
    }

    /// # Errors
    ///
    /// Propagates the session's rejection unchanged.
    pub fn select_option(&mut self, index: usize) -> Result<SessionEvent, QuizSessionError> {
        self.session.select_option(index)
    }

    /// # Errors
    ///
    /// Propagates the session's rejection unchanged.
    pub async fn submit(&mut self) -> Result<SessionEvent, QuizSessionError> {
        let event = self.session.submit()?;
        if let SessionEvent::Answered(outcome) = &event {
            self.record_response(outcome).await;
        }
        Ok(event)
    }

    /// # Errors
    ///
    /// Propagates the session's rejection unchanged.
    pub fn toggle_bookmark(&mut self) -> Result<SessionEvent, QuizSessionError> {
        self.session.toggle_bookmark()
    }

    /// # Errors
    ///
    /// Propagates the session's rejection unchanged.
    pub async fn advance(&mut self) -> Result<SessionEvent, QuizSessionError> {
        let event = self.session.advance()?;
        if let SessionEvent::Completed(summary) = &event {
            self.finish(summary).await;
        }
        Ok(event)
    }

    async fn record_response(&self, outcome: &AnswerOutcome) {
        let Some(attempt_id) = self.attempt_id else {
            return;
        };
        let response = ResponseRecord {
            attempt_id,
            question_id: outcome.question_id,
            chosen_option: outcome.chosen,
            correct: outcome.correct,
            elapsed_seconds: outcome.elapsed_seconds,
            answered_at: self.clock.now(),
        };
        bounded_write(
            self.write_timeout,
            &format!("record response for question {}", outcome.question_id),
            self.attempts.record_response(&response),
        )
        .await;
    }

    async fn finish(&mut self, summary: &QuizSummary) {
        if let Some(attempt_id) = self.attempt_id {
            let result = AttemptResult {
                score: summary.score,
                total_questions: summary.total_questions,
                score_percentage: summary.score_percentage(),
                elapsed_seconds: self.clock.elapsed_secs(self.started_at),
                completed_at: self.clock.now(),
            };
            bounded_write(
                self.write_timeout,
                &format!("finalize attempt {attempt_id}"),
                self.attempts.finalize_attempt(attempt_id, &result),
            )
            .await;
        }

        self.user
            .apply_quiz_result(summary.points_earned, self.clock.today());
        bounded_write(
            self.write_timeout,
            &format!("update profile {}", self.user.id),
            self.identity.update_profile(&self.user),
        )
        .await;

        log::info!(
            "quiz complete: {}/{} correct, {} points",
            summary.score,
            summary.total_questions,
            summary.points_earned
        );
    }
}

/// Await a storage write for at most `limit`, logging instead of failing.
async fn bounded_write<T>(
    limit: Duration,
    what: &str,
    write: impl Future<Output = Result<T, StorageError>>,
) -> Option<T> {
    match tokio::time::timeout(limit, write).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            log::warn!("could not {what}: {err}");
            None
        }
        Err(_) => {
            log::warn!("{what} timed out after {limit:?}");
            None
        }
    }
}
