use chrono::Duration;
use quiz_core::model::{
    Difficulty, DifficultyInfo, OptionDraft, QuestionId, Topic, TopicInfo, UserId, UserProfile,
};
use quiz_core::time::fixed_now;
use storage::repository::{
    AttemptRecorder, AttemptResult, CatalogRepository, IdentityProvider, NewAttempt,
    ProfileRepository, QuestionProvider, QuestionRecord, QuestionRepository, ResponseRecord,
    StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_catalog(repo: &SqliteRepository) {
    for name in ["rust", "go"] {
        repo.upsert_topic(&TopicInfo {
            topic: Topic::new(name).unwrap(),
            description: None,
        })
        .await
        .unwrap();
    }
    for (order, name) in [(2, "expert"), (1, "easy")] {
        repo.upsert_difficulty(&DifficultyInfo {
            difficulty: Difficulty::new(name).unwrap(),
            level_order: order,
            description: None,
        })
        .await
        .unwrap();
    }
}

fn question(seq: i64, correct_order: Option<u32>) -> QuestionRecord {
    // Options are inserted out of order to exercise sorting on load.
    let options = [3_u32, 1, 2]
        .into_iter()
        .map(|order| OptionDraft::new(order, format!("opt {order}"), Some(order) == correct_order))
        .collect();
    QuestionRecord {
        id: QuestionId::random(),
        topic: Topic::new("rust").unwrap(),
        difficulty: Difficulty::new("easy").unwrap(),
        text: format!("question {seq}"),
        code_snippet: (seq == 0).then(|| "fn main() {}".to_string()),
        explanation: None,
        points: None,
        options,
        created_at: fixed_now() + Duration::seconds(seq),
    }
}

#[tokio::test]
async fn sqlite_catalog_is_ordered() {
    let repo = connect("memdb_catalog").await;
    seed_catalog(&repo).await;

    let topics: Vec<_> = repo
        .list_topics()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.topic.as_str().to_string())
        .collect();
    assert_eq!(topics, vec!["GO", "RUST"]);

    let tiers: Vec<_> = repo
        .list_difficulties()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.difficulty.as_str().to_string())
        .collect();
    assert_eq!(tiers, vec!["Easy", "Expert"]);
}

#[tokio::test]
async fn sqlite_fetch_rebuilds_questions_in_creation_order() {
    let repo = connect("memdb_fetch").await;
    seed_catalog(&repo).await;

    let first = question(0, Some(2));
    let second = question(1, None);
    let third = question(2, Some(3));
    // Insert newest first; fetch must still follow created_at.
    for record in [&third, &second, &first] {
        repo.upsert_question(record).await.unwrap();
    }

    let rust = Topic::new("RUST").unwrap();
    let easy = Difficulty::new("Easy").unwrap();
    let fetched = repo.fetch(&rust, &easy, 2).await.unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].id(), first.id);
    assert_eq!(fetched[1].id(), second.id);

    let q = &fetched[0];
    let texts: Vec<_> = q.options().iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["opt 1", "opt 2", "opt 3"]);
    assert_eq!(q.correct_index(), 1);
    assert_eq!(q.points(), 10);
    assert_eq!(q.explanation(), "No explanation available.");
    assert_eq!(q.code_snippet(), Some("fn main() {}"));

    assert_eq!(fetched[1].correct_index(), 0);

    let none = repo
        .fetch(&Topic::new("go").unwrap(), &easy, 10)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn sqlite_fetch_skips_malformed_questions() {
    let repo = connect("memdb_malformed").await;
    seed_catalog(&repo).await;

    let good = question(0, Some(1));
    let mut gap = question(1, Some(1));
    gap.options = vec![
        OptionDraft::new(1, "a", true),
        OptionDraft::new(3, "c", false),
    ];
    let mut lonely = question(2, None);
    lonely.options = vec![OptionDraft::new(1, "only", true)];
    for record in [&good, &gap, &lonely] {
        repo.upsert_question(record).await.unwrap();
    }

    let fetched = repo
        .fetch(
            &Topic::new("rust").unwrap(),
            &Difficulty::new("easy").unwrap(),
            10,
        )
        .await
        .unwrap();
    let ids: Vec<_> = fetched.iter().map(|q| q.id()).collect();
    assert_eq!(ids, vec![good.id]);
}

#[tokio::test]
async fn sqlite_fetch_unknown_catalog_entry_is_not_found() {
    let repo = connect("memdb_not_found").await;
    seed_catalog(&repo).await;

    let err = repo
        .fetch(
            &Topic::new("haskell").unwrap(),
            &Difficulty::new("easy").unwrap(),
            5,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = repo
        .fetch(
            &Topic::new("rust").unwrap(),
            &Difficulty::new("legendary").unwrap(),
            5,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_attempt_lifecycle_persists_responses() {
    let repo = connect("memdb_attempts").await;
    seed_catalog(&repo).await;
    let record = question(0, Some(1));
    repo.upsert_question(&record).await.unwrap();

    let profile = UserProfile::new(UserId::random(), "ada");
    repo.upsert_profile(&profile).await.unwrap();

    let attempt_id = repo
        .create_attempt(&NewAttempt {
            user_id: profile.id,
            topic: record.topic.clone(),
            difficulty: record.difficulty.clone(),
            total_questions: 2,
            started_at: fixed_now(),
        })
        .await
        .unwrap();

    repo.record_response(&ResponseRecord {
        attempt_id,
        question_id: record.id,
        chosen_option: Some(0),
        correct: true,
        elapsed_seconds: 12,
        answered_at: fixed_now(),
    })
    .await
    .unwrap();
    repo.record_response(&ResponseRecord {
        attempt_id,
        question_id: record.id,
        chosen_option: None,
        correct: false,
        elapsed_seconds: 60,
        answered_at: fixed_now(),
    })
    .await
    .unwrap();

    let open = repo.get_attempt(attempt_id).await.unwrap();
    assert!(open.completed_at.is_none());

    repo.finalize_attempt(
        attempt_id,
        &AttemptResult {
            score: 1,
            total_questions: 2,
            score_percentage: 50,
            elapsed_seconds: 72,
            completed_at: fixed_now() + Duration::seconds(72),
        },
    )
    .await
    .unwrap();

    let done = repo.get_attempt(attempt_id).await.unwrap();
    assert_eq!(done.correct_answers, 1);
    assert_eq!(done.score_percentage, Some(50));
    assert_eq!(done.time_taken_seconds, Some(72));
    assert_eq!(done.completed_at, Some(fixed_now() + Duration::seconds(72)));

    let responses = repo.list_responses(attempt_id).await.unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].chosen_option, Some(0));
    assert_eq!(responses[1].chosen_option, None);
    assert!(!responses[1].correct);
}

#[tokio::test]
async fn sqlite_unknown_attempt_is_not_found() {
    let repo = connect("memdb_unknown_attempt").await;
    let missing = quiz_core::model::AttemptId::random();
    let err = repo
        .finalize_attempt(
            missing,
            &AttemptResult {
                score: 0,
                total_questions: 0,
                score_percentage: 0,
                elapsed_seconds: 0,
                completed_at: fixed_now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert!(matches!(
        repo.get_attempt(missing).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn sqlite_identity_updates_profile_progress() {
    let repo = connect("memdb_identity").await;
    let mut profile = UserProfile::new(UserId::random(), "lin");
    repo.upsert_profile(&profile).await.unwrap();

    let identity = repo.identity(Some(profile.id));
    let today = fixed_now().date_naive();
    profile.apply_quiz_result(1_250, today);
    identity.update_profile(&profile).await.unwrap();

    let stored = identity.current_user().await.unwrap().expect("profile");
    assert_eq!(stored.xp_points, 1_250);
    assert_eq!(stored.level, 2);
    assert_eq!(stored.streak_days, 1);
    assert_eq!(stored.last_activity, Some(today));

    assert!(repo.identity(None).current_user().await.unwrap().is_none());
}
