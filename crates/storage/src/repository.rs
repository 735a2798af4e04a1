use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AttemptId, Difficulty, DifficultyInfo, OptionDraft, Question, QuestionError, QuestionId,
    Topic, TopicInfo, UserId, UserProfile,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape of a question together with its catalog placement.
///
/// Options keep the backend's `order`/`is_correct` representation; the domain
/// `Question` is rebuilt through `into_question` so validation stays in one place.
#[derive(Debug, Clone)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub text: String,
    pub code_snippet: Option<String>,
    pub explanation: Option<String>,
    pub points: Option<i64>,
    pub options: Vec<OptionDraft>,
    pub created_at: DateTime<Utc>,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(
        question: &Question,
        topic: Topic,
        difficulty: Difficulty,
        created_at: DateTime<Utc>,
    ) -> Self {
        let options = question
            .options()
            .iter()
            .enumerate()
            .map(|(i, o)| OptionDraft::new(o.order, o.text.clone(), question.is_correct(i)))
            .collect();
        Self {
            id: question.id(),
            topic,
            difficulty,
            text: question.text().to_owned(),
            code_snippet: question.code_snippet().map(str::to_owned),
            explanation: Some(question.explanation().to_owned()),
            points: Some(i64::from(question.points())),
            options,
            created_at,
        }
    }

    /// Convert the record back into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the stored rows do not form a valid question.
    pub fn into_question(self) -> Result<Question, QuestionError> {
        Question::from_persisted(
            self.id,
            self.text,
            self.code_snippet,
            self.options,
            self.explanation,
            self.points,
        )
    }
}

/// Data needed to open an attempt before the first answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttempt {
    pub user_id: UserId,
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub started_at: DateTime<Utc>,
}

/// One answered (or timed-out) question within an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub attempt_id: AttemptId,
    pub question_id: QuestionId,
    pub chosen_option: Option<usize>,
    pub correct: bool,
    pub elapsed_seconds: u32,
    pub answered_at: DateTime<Utc>,
}

/// Final numbers written when an attempt completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub score: u32,
    pub total_questions: u32,
    pub score_percentage: u32,
    pub elapsed_seconds: u32,
    pub completed_at: DateTime<Utc>,
}

/// Stored attempt row. `completed_at` stays `None` until finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub id: AttemptId,
    pub user_id: UserId,
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score_percentage: Option<u32>,
    pub time_taken_seconds: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    #[must_use]
    pub fn open(id: AttemptId, attempt: &NewAttempt) -> Self {
        Self {
            id,
            user_id: attempt.user_id,
            topic: attempt.topic.clone(),
            difficulty: attempt.difficulty.clone(),
            total_questions: attempt.total_questions,
            correct_answers: 0,
            score_percentage: None,
            time_taken_seconds: None,
            started_at: attempt.started_at,
            completed_at: None,
        }
    }

    pub fn finalize(&mut self, result: &AttemptResult) {
        self.correct_answers = result.score;
        self.total_questions = result.total_questions;
        self.score_percentage = Some(result.score_percentage);
        self.time_taken_seconds = Some(result.elapsed_seconds);
        self.completed_at = Some(result.completed_at);
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Source of questions for a topic/difficulty pair.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Fetch up to `limit` questions in stable order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic or difficulty is unknown,
    /// `StorageError::Unavailable` on transport failure.
    async fn fetch(
        &self,
        topic: &Topic,
        difficulty: &Difficulty,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Write side for question content, used by seeding and tests.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or replace a question and its options.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if its topic or difficulty is not in the catalog.
    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError>;
}

/// Persists attempts and their responses.
#[async_trait]
pub trait AttemptRecorder: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the attempt cannot be stored.
    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<AttemptId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown attempt, or other storage errors.
    async fn record_response(&self, response: &ResponseRecord) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown attempt, or other storage errors.
    async fn finalize_attempt(
        &self,
        attempt_id: AttemptId,
        result: &AttemptResult,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_attempt(&self, attempt_id: AttemptId) -> Result<AttemptRecord, StorageError>;

    /// Responses for an attempt in the order they were recorded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_responses(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<ResponseRecord>, StorageError>;
}

/// Stored learner profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, StorageError>;
}

/// Supplies the signed-in learner.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn current_user(&self) -> Result<Option<UserProfile>, StorageError>;

    /// Persist updated progression stats for the signed-in learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn update_profile(&self, profile: &UserProfile) -> Result<(), StorageError>;
}

/// Topics and difficulty tiers offered for selection.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn upsert_topic(&self, topic: &TopicInfo) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn upsert_difficulty(&self, difficulty: &DifficultyInfo) -> Result<(), StorageError>;

    /// Topics ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_topics(&self) -> Result<Vec<TopicInfo>, StorageError>;

    /// Difficulties ordered by `level_order`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_difficulties(&self) -> Result<Vec<DifficultyInfo>, StorageError>;
}

//
// ─── LOCAL IDENTITY ────────────────────────────────────────────────────────────
//

/// Identity backed by a configured profile id.
///
/// Sign-in itself is handled elsewhere; this only resolves the chosen
/// profile from a `ProfileRepository`.
#[derive(Clone)]
pub struct LocalIdentity {
    profiles: Arc<dyn ProfileRepository>,
    user_id: Option<UserId>,
}

impl LocalIdentity {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>, user_id: Option<UserId>) -> Self {
        Self { profiles, user_id }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn current_user(&self) -> Result<Option<UserProfile>, StorageError> {
        match self.user_id {
            Some(id) => self.profiles.get_profile(id).await,
            None => Ok(None),
        }
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        if self.user_id != Some(profile.id) {
            return Err(StorageError::Conflict);
        }
        self.profiles.upsert_profile(profile).await
    }
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    topics: HashMap<Topic, TopicInfo>,
    difficulties: HashMap<Difficulty, DifficultyInfo>,
    questions: Vec<QuestionRecord>,
    attempts: HashMap<AttemptId, AttemptRecord>,
    responses: Vec<ResponseRecord>,
    profiles: HashMap<UserId, UserProfile>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// `fail_recording(true)` makes every `AttemptRecorder` call return
/// `StorageError::Unavailable` to exercise best-effort persistence.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    fail_recording: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_recording(&self, fail: bool) {
        self.fail_recording.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every stored attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the lock is poisoned.
    pub fn attempts(&self) -> Result<Vec<AttemptRecord>, StorageError> {
        Ok(self.lock()?.attempts.values().cloned().collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    fn ensure_recording(&self) -> Result<(), StorageError> {
        if self.fail_recording.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("recording disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionProvider for InMemoryRepository {
    async fn fetch(
        &self,
        topic: &Topic,
        difficulty: &Difficulty,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        if !guard.topics.contains_key(topic) || !guard.difficulties.contains_key(difficulty) {
            return Err(StorageError::NotFound);
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut matching: Vec<&QuestionRecord> = guard
            .questions
            .iter()
            .filter(|r| &r.topic == topic && &r.difficulty == difficulty)
            .collect();
        matching.sort_by_key(|r| (r.created_at, r.id));
        Ok(matching
            .into_iter()
            .take(limit)
            .filter_map(|r| match r.clone().into_question() {
                Ok(question) => Some(question),
                Err(err) => {
                    log::warn!("skipping malformed question {}: {err}", r.id);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.topics.contains_key(&record.topic)
            || !guard.difficulties.contains_key(&record.difficulty)
        {
            return Err(StorageError::NotFound);
        }
        match guard.questions.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => guard.questions.push(record.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl AttemptRecorder for InMemoryRepository {
    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<AttemptId, StorageError> {
        self.ensure_recording()?;
        let id = AttemptId::random();
        self.lock()?
            .attempts
            .insert(id, AttemptRecord::open(id, attempt));
        Ok(id)
    }

    async fn record_response(&self, response: &ResponseRecord) -> Result<(), StorageError> {
        self.ensure_recording()?;
        let mut guard = self.lock()?;
        if !guard.attempts.contains_key(&response.attempt_id) {
            return Err(StorageError::NotFound);
        }
        guard.responses.push(response.clone());
        Ok(())
    }

    async fn finalize_attempt(
        &self,
        attempt_id: AttemptId,
        result: &AttemptResult,
    ) -> Result<(), StorageError> {
        self.ensure_recording()?;
        let mut guard = self.lock()?;
        let attempt = guard
            .attempts
            .get_mut(&attempt_id)
            .ok_or(StorageError::NotFound)?;
        attempt.finalize(result);
        Ok(())
    }

    async fn get_attempt(&self, attempt_id: AttemptId) -> Result<AttemptRecord, StorageError> {
        self.lock()?
            .attempts
            .get(&attempt_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_responses(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<ResponseRecord>, StorageError> {
        Ok(self
            .lock()?
            .responses
            .iter()
            .filter(|r| r.attempt_id == attempt_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        self.lock()?.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        Ok(self.lock()?.profiles.get(&id).cloned())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_topic(&self, topic: &TopicInfo) -> Result<(), StorageError> {
        self.lock()?
            .topics
            .insert(topic.topic.clone(), topic.clone());
        Ok(())
    }

    async fn upsert_difficulty(&self, difficulty: &DifficultyInfo) -> Result<(), StorageError> {
        self.lock()?
            .difficulties
            .insert(difficulty.difficulty.clone(), difficulty.clone());
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<TopicInfo>, StorageError> {
        let mut topics: Vec<_> = self.lock()?.topics.values().cloned().collect();
        topics.sort_by(|a, b| a.topic.as_str().cmp(b.topic.as_str()));
        Ok(topics)
    }

    async fn list_difficulties(&self) -> Result<Vec<DifficultyInfo>, StorageError> {
        let mut tiers: Vec<_> = self.lock()?.difficulties.values().cloned().collect();
        tiers.sort_by_key(|d| d.level_order);
        Ok(tiers)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub provider: Arc<dyn QuestionProvider>,
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRecorder>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(&InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository so tests can keep a handle to it.
    #[must_use]
    pub fn from_memory(repo: &InMemoryRepository) -> Self {
        Self {
            catalog: Arc::new(repo.clone()),
            provider: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            profiles: Arc::new(repo.clone()),
        }
    }

    /// Identity resolving `user_id` against this storage's profiles.
    #[must_use]
    pub fn identity(&self, user_id: Option<UserId>) -> LocalIdentity {
        LocalIdentity::new(Arc::clone(&self.profiles), user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn rust() -> Topic {
        Topic::new("rust").unwrap()
    }

    fn easy() -> Difficulty {
        Difficulty::new("easy").unwrap()
    }

    async fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.upsert_topic(&TopicInfo {
            topic: rust(),
            description: None,
        })
        .await
        .unwrap();
        repo.upsert_difficulty(&DifficultyInfo {
            difficulty: easy(),
            level_order: 1,
            description: None,
        })
        .await
        .unwrap();
        repo
    }

    fn record(seq: i64, text: &str) -> QuestionRecord {
        QuestionRecord {
            id: QuestionId::random(),
            topic: rust(),
            difficulty: easy(),
            text: text.into(),
            code_snippet: None,
            explanation: None,
            points: None,
            options: vec![
                OptionDraft::new(2, "b", true),
                OptionDraft::new(1, "a", false),
            ],
            created_at: fixed_now() + chrono::Duration::seconds(seq),
        }
    }

    #[tokio::test]
    async fn fetch_unknown_topic_is_not_found() {
        let repo = seeded().await;
        let err = repo
            .fetch(&Topic::new("cobol").unwrap(), &easy(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn fetch_skips_malformed_questions() {
        let repo = seeded().await;
        let good = record(0, "good");
        let mut broken = record(1, "broken");
        broken.options = vec![OptionDraft::new(1, "a", true)];
        repo.upsert_question(&broken).await.unwrap();
        repo.upsert_question(&good).await.unwrap();

        let fetched = repo.fetch(&rust(), &easy(), 10).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id(), good.id);
    }

    #[tokio::test]
    async fn fetch_respects_limit_and_order() {
        let repo = seeded().await;
        for (seq, text) in [(2, "three"), (0, "one"), (1, "two")] {
            repo.upsert_question(&record(seq, text)).await.unwrap();
        }
        let fetched = repo.fetch(&rust(), &easy(), 2).await.unwrap();
        let texts: Vec<_> = fetched.iter().map(Question::text).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(fetched[0].correct_index(), 1);
    }

    #[tokio::test]
    async fn recording_failure_is_unavailable() {
        let repo = seeded().await;
        repo.fail_recording(true);
        let err = repo
            .create_attempt(&NewAttempt {
                user_id: UserId::random(),
                topic: rust(),
                difficulty: easy(),
                total_questions: 3,
                started_at: fixed_now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[tokio::test]
    async fn local_identity_resolves_configured_profile() {
        let storage = Storage::in_memory();
        let profile = UserProfile::new(UserId::random(), "grace");
        storage.profiles.upsert_profile(&profile).await.unwrap();

        let signed_in = storage.identity(Some(profile.id));
        assert_eq!(signed_in.current_user().await.unwrap(), Some(profile.clone()));

        let anonymous = storage.identity(None);
        assert_eq!(anonymous.current_user().await.unwrap(), None);
        assert!(matches!(
            anonymous.update_profile(&profile).await.unwrap_err(),
            StorageError::Conflict
        ));
    }
}
