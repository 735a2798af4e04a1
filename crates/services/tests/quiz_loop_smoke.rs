use std::sync::Arc;

use chrono::Duration;
use quiz_core::model::{
    Difficulty, DifficultyInfo, OptionDraft, QuestionId, QuizSettings, Topic, TopicInfo, UserId,
    UserProfile,
};
use quiz_core::time::fixed_now;
use quiz_core::{QuizSessionError, SessionEvent};
use services::{Clock, QuizLoopService, QuizServiceError};
use storage::repository::{
    AttemptRecorder, CatalogRepository, InMemoryRepository, ProfileRepository, QuestionRecord,
    QuestionRepository, Storage,
};

struct Fixture {
    repo: InMemoryRepository,
    storage: Storage,
    user: UserProfile,
    settings: QuizSettings,
}

async fn fixture(questions: u32) -> Fixture {
    let repo = InMemoryRepository::new();
    let topic = Topic::new("rust").unwrap();
    let difficulty = Difficulty::new("easy").unwrap();
    repo.upsert_topic(&TopicInfo {
        topic: topic.clone(),
        description: None,
    })
    .await
    .unwrap();
    repo.upsert_difficulty(&DifficultyInfo {
        difficulty: difficulty.clone(),
        level_order: 1,
        description: None,
    })
    .await
    .unwrap();

    for seq in 0..questions {
        repo.upsert_question(&QuestionRecord {
            id: QuestionId::random(),
            topic: topic.clone(),
            difficulty: difficulty.clone(),
            text: format!("Q{seq}"),
            code_snippet: None,
            explanation: Some(format!("because {seq}")),
            points: Some(25),
            options: vec![
                OptionDraft::new(1, "right", true),
                OptionDraft::new(2, "wrong", false),
            ],
            created_at: fixed_now() + Duration::seconds(i64::from(seq)),
        })
        .await
        .unwrap();
    }

    let user = UserProfile::new(UserId::random(), "ada");
    repo.upsert_profile(&user).await.unwrap();

    let settings = QuizSettings::new(topic, difficulty)
        .with_time_per_question(30)
        .unwrap();

    Fixture {
        storage: Storage::from_memory(&repo),
        repo,
        user,
        settings,
    }
}

fn loop_service(fx: &Fixture, user_id: Option<UserId>) -> QuizLoopService {
    QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::clone(&fx.storage.provider),
        Arc::clone(&fx.storage.attempts),
        Arc::new(fx.storage.identity(user_id)),
    )
}

#[tokio::test]
async fn quiz_loop_records_attempt_and_rewards_profile() {
    let fx = fixture(2).await;
    let svc = loop_service(&fx, Some(fx.user.id));

    let mut quiz = svc.start_quiz(&fx.settings).await.unwrap();
    let attempt_id = quiz.attempt_id().expect("attempt created");
    assert_eq!(quiz.session().time_per_question(), 30);

    quiz.select_option(0).unwrap();
    let answered = quiz.submit().await.unwrap();
    assert!(matches!(answered, SessionEvent::Answered(ref o) if o.correct));
    quiz.advance().await.unwrap();

    for _ in 0..30 {
        quiz.tick().await;
    }
    assert!(quiz.session().is_revealed());
    quiz.advance_clock(Duration::seconds(45));
    let done = quiz.advance().await.unwrap();
    let SessionEvent::Completed(summary) = done else {
        panic!("expected completion, got {done:?}");
    };
    assert_eq!(summary.score, 1);
    assert_eq!(summary.points_earned, 25);

    let attempt = fx.repo.get_attempt(attempt_id).await.unwrap();
    assert_eq!(attempt.correct_answers, 1);
    assert_eq!(attempt.total_questions, 2);
    assert_eq!(attempt.score_percentage, Some(50));
    assert_eq!(attempt.time_taken_seconds, Some(45));

    let responses = fx.repo.list_responses(attempt_id).await.unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].chosen_option, Some(0));
    assert_eq!(responses[1].chosen_option, None);
    assert_eq!(responses[1].elapsed_seconds, 30);

    let stored = fx.repo.get_profile(fx.user.id).await.unwrap().unwrap();
    assert_eq!(stored.xp_points, 25);
    assert_eq!(stored.streak_days, 1);
    assert_eq!(stored.last_activity, Some(fixed_now().date_naive()));
    assert_eq!(quiz.user(), &stored);
}

#[tokio::test]
async fn quiz_loop_requires_signed_in_user() {
    let fx = fixture(1).await;
    let svc = loop_service(&fx, None);
    let err = svc.start_quiz(&fx.settings).await.err().expect("error");
    assert!(matches!(err, QuizServiceError::Unauthenticated));
}

#[tokio::test]
async fn quiz_loop_reports_empty_and_unknown_catalog_as_no_questions() {
    let fx = fixture(0).await;
    let svc = loop_service(&fx, Some(fx.user.id));

    let err = svc.start_quiz(&fx.settings).await.err().expect("error");
    assert!(matches!(err, QuizServiceError::NoQuestions));

    let unknown = QuizSettings::new(
        Topic::new("cobol").unwrap(),
        Difficulty::new("easy").unwrap(),
    );
    let err = svc.start_quiz(&unknown).await.err().expect("error");
    assert!(matches!(err, QuizServiceError::NoQuestions));
}

#[tokio::test]
async fn quiz_loop_survives_recording_failures() {
    let fx = fixture(1).await;
    fx.repo.fail_recording(true);
    let svc = loop_service(&fx, Some(fx.user.id));

    let mut quiz = svc.start_quiz(&fx.settings).await.unwrap();
    assert!(quiz.attempt_id().is_none());

    quiz.select_option(1).unwrap();
    quiz.submit().await.unwrap();
    assert!(matches!(
        quiz.advance().await.unwrap(),
        SessionEvent::Completed(_)
    ));
    assert!(fx.repo.attempts().unwrap().is_empty());
    assert!(quiz.session().summary().is_ok());
}

#[tokio::test]
async fn quiz_loop_forwards_session_rejections() {
    let fx = fixture(1).await;
    let svc = loop_service(&fx, Some(fx.user.id));
    let mut quiz = svc.start_quiz(&fx.settings).await.unwrap();

    assert_eq!(quiz.submit().await, Err(QuizSessionError::NoSelection));
    assert_eq!(quiz.advance().await, Err(QuizSessionError::NotRevealed));
    assert!(matches!(
        quiz.select_option(5),
        Err(QuizSessionError::OptionOutOfRange { index: 5, len: 2 })
    ));

    let attempt_id = quiz.attempt_id().unwrap();
    assert!(fx.repo.list_responses(attempt_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn quiz_loop_limits_question_count() {
    let fx = fixture(5).await;
    let svc = loop_service(&fx, Some(fx.user.id)).with_shuffle(true);
    let settings = fx.settings.clone().with_question_limit(3).unwrap();

    let quiz = svc.start_quiz(&settings).await.unwrap();
    assert_eq!(quiz.session().total_questions(), 3);
}
