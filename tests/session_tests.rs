
use chrono::{Duration, Utc};
use serde_json::json;
use vignette_quiz::clients::MockResponse;
use vignette_quiz::schema::Topic;
use vignette_quiz::session::{QuestionOutcome, GENERATION_FAILED_MESSAGE};
use vignette_quiz::{OptionKey, QuizState, Score, Session, SessionError, Vignette};

use crate::test_utils::{init_test_logging, mock_quiz, ok_response, vignette_json};

fn sample_vignette() -> Vignette {
    Vignette::from_value(vignette_json(), Topic::Fsa).unwrap()
}

#[tokio::test]
async fn happy_path_select_answer_submit() {
    init_test_logging();
    let (mut quiz, handle) = mock_quiz();
    handle.push(ok_response());
    assert_eq!(quiz.state(), &QuizState::NoSession { error: None });

    quiz.select_topic(Topic::Fsa).await.unwrap();
    let session = quiz.session().unwrap();
    assert!(matches!(quiz.state(), QuizState::Active(_)));
    assert!(session.answers().is_empty());
    assert!(!session.is_complete());
    assert_eq!(session.vignette().topic(), Topic::Fsa);

    quiz.answer("q1", OptionKey::A).unwrap();
    let session = quiz.session().unwrap();
    assert_eq!(session.answers().len(), 1);
    assert_eq!(session.answer_for("q1"), Some(OptionKey::A));
    assert!(matches!(quiz.state(), QuizState::Active(_)));

    let score = quiz.submit().unwrap();
    assert_eq!(score, Score { correct: 1, total: 3 });
    assert!(matches!(quiz.state(), QuizState::Complete(_)));
    assert!(quiz.session().unwrap().is_complete());
}

#[tokio::test]
async fn generation_failure_returns_to_no_session() {
    let (mut quiz, handle) = mock_quiz();
    handle.push(MockResponse::Error("503 service unavailable".to_string()));

    quiz.select_topic(Topic::Ethics).await.unwrap();

    assert!(quiz.session().is_none());
    assert_eq!(quiz.state().error(), Some(GENERATION_FAILED_MESSAGE));
    assert_eq!(handle.call_count(), 1);
}

#[tokio::test]
async fn schema_violation_is_reported_like_any_failure() {
    let (mut quiz, handle) = mock_quiz();
    let mut payload = vignette_json();
    payload["questions"].as_array_mut().unwrap().pop();
    handle.push(MockResponse::json(&payload));

    quiz.select_topic(Topic::Quants).await.unwrap();

    assert_eq!(
        quiz.state(),
        &QuizState::NoSession { error: Some(GENERATION_FAILED_MESSAGE.to_string()) }
    );
}

#[tokio::test]
async fn retry_after_failure_starts_a_session() {
    let (mut quiz, handle) = mock_quiz();
    handle.push_many([MockResponse::Error("timeout".to_string()), ok_response()]);

    quiz.select_topic(Topic::Economics).await.unwrap();
    assert!(quiz.state().error().is_some());

    quiz.select_topic(Topic::Economics).await.unwrap();
    assert!(matches!(quiz.state(), QuizState::Active(_)));
    assert_eq!(quiz.state().error(), None);
}

#[tokio::test]
async fn reset_from_active_and_complete() {
    let (mut quiz, handle) = mock_quiz();
    handle.push_many([ok_response(), ok_response()]);

    quiz.select_topic(Topic::Equity).await.unwrap();
    quiz.answer("q2", OptionKey::C).unwrap();
    quiz.reset();
    assert_eq!(quiz.state(), &QuizState::NoSession { error: None });
    assert!(quiz.session().is_none());

    quiz.select_topic(Topic::Equity).await.unwrap();
    quiz.submit().unwrap();
    quiz.reset();
    assert_eq!(quiz.state(), &QuizState::NoSession { error: None });
}

#[tokio::test]
async fn reset_clears_error() {
    let (mut quiz, handle) = mock_quiz();
    handle.push(MockResponse::Error("boom".to_string()));

    quiz.select_topic(Topic::Alternatives).await.unwrap();
    quiz.reset();
    assert_eq!(quiz.state().error(), None);
}

#[tokio::test]
async fn selecting_while_active_is_rejected() {
    let (mut quiz, handle) = mock_quiz();
    handle.push(ok_response());
    quiz.select_topic(Topic::Fsa).await.unwrap();
    quiz.answer("q1", OptionKey::B).unwrap();
    let before = quiz.state().clone();

    let err = quiz.select_topic(Topic::Derivatives).await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidTransition { state: "active", .. }));
    assert_eq!(quiz.state(), &before);
    assert_eq!(handle.call_count(), 1);
}

#[tokio::test]
async fn selecting_from_complete_starts_new_session() {
    let (mut quiz, handle) = mock_quiz();
    handle.push_many([ok_response(), ok_response()]);
    quiz.select_topic(Topic::Fsa).await.unwrap();
    quiz.answer("q1", OptionKey::A).unwrap();
    quiz.submit().unwrap();

    quiz.select_topic(Topic::Portfolio).await.unwrap();

    let session = quiz.session().unwrap();
    assert!(!session.is_complete());
    assert!(session.answers().is_empty());
    assert_eq!(session.vignette().topic(), Topic::Portfolio);
}

#[test]
fn loading_is_observable_and_blocks_other_transitions() {
    let (mut quiz, _handle) = mock_quiz();

    quiz.begin_loading(Topic::FixedIncome).unwrap();
    assert_eq!(quiz.state(), &QuizState::Loading { topic: Topic::FixedIncome });

    assert!(quiz.begin_loading(Topic::Ethics).is_err());
    assert_eq!(quiz.answer("q1", OptionKey::A), Err(SessionError::NoActiveSession));
    assert!(quiz.submit().is_err());
    assert_eq!(quiz.state(), &QuizState::Loading { topic: Topic::FixedIncome });

    quiz.finish_loading(Ok(sample_vignette())).unwrap();
    assert!(matches!(quiz.state(), QuizState::Active(_)));
}

#[test]
fn finish_loading_outside_loading_is_rejected() {
    let (mut quiz, _handle) = mock_quiz();

    let err = quiz.finish_loading(Ok(sample_vignette())).unwrap_err();

    assert_eq!(err, SessionError::InvalidTransition { action: "finish loading", state: "no session" });
    assert_eq!(quiz.state(), &QuizState::default());
}

#[test]
fn answer_and_submit_without_session() {
    let (mut quiz, _handle) = mock_quiz();

    assert_eq!(quiz.answer("q1", OptionKey::A), Err(SessionError::NoActiveSession));
    assert_eq!(
        quiz.submit(),
        Err(SessionError::InvalidTransition { action: "submit", state: "no session" })
    );
    assert_eq!(quiz.state(), &QuizState::default());
}

#[tokio::test]
async fn answers_are_frozen_after_submit() {
    let (mut quiz, handle) = mock_quiz();
    handle.push(ok_response());
    quiz.select_topic(Topic::Fsa).await.unwrap();
    quiz.answer("q1", OptionKey::B).unwrap();
    quiz.submit().unwrap();

    assert_eq!(quiz.answer("q1", OptionKey::A), Err(SessionError::AnswersFrozen));
    assert_eq!(quiz.session().unwrap().answer_for("q1"), Some(OptionKey::B));
    assert!(quiz.submit().is_err());
}

#[tokio::test]
async fn unknown_question_leaves_answers_untouched() {
    let (mut quiz, handle) = mock_quiz();
    handle.push(ok_response());
    quiz.select_topic(Topic::Fsa).await.unwrap();

    let err = quiz.answer("q9", OptionKey::A).unwrap_err();

    assert_eq!(err, SessionError::UnknownQuestion("q9".to_string()));
    assert!(quiz.session().unwrap().answers().is_empty());
}

#[tokio::test]
async fn refresh_regenerates_same_topic() {
    let (mut quiz, handle) = mock_quiz();
    handle.push_many([ok_response(), ok_response()]);
    quiz.select_topic(Topic::Derivatives).await.unwrap();

    assert!(quiz.refresh().await.is_err());

    quiz.submit().unwrap();
    quiz.refresh().await.unwrap();

    let requests = handle.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].prompt, requests[1].prompt);
    let session = quiz.session().unwrap();
    assert!(!session.is_complete());
    assert_eq!(session.vignette().topic(), Topic::Derivatives);
}

#[test]
fn answering_overwrites_previous_choice() {
    let mut session = Session::new(sample_vignette());

    session.answer("q3", OptionKey::A).unwrap();
    session.answer("q3", OptionKey::B).unwrap();

    assert_eq!(session.answers().len(), 1);
    assert_eq!(session.answer_for("q3"), Some(OptionKey::B));
}

#[test]
fn score_counts_unanswered_as_incorrect() {
    // correct answers: q1:A, q2:C, q3:B
    let mut session = Session::new(sample_vignette());
    session.answer("q1", OptionKey::A).unwrap();
    session.answer("q2", OptionKey::B).unwrap();

    assert_eq!(session.score(), Score { correct: 1, total: 3 });
    assert_eq!(session.score().to_string(), "1 / 3");
    assert_eq!(session.answered_count(), 2);
    assert!(!session.all_answered());

    let outcomes: Vec<_> = session.review().into_iter().map(|(_, outcome)| outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            QuestionOutcome::Correct,
            QuestionOutcome::Incorrect { chosen: OptionKey::B },
            QuestionOutcome::Unanswered,
        ]
    );
}

#[test]
fn perfect_score() {
    let mut session = Session::new(sample_vignette());
    for (id, key) in [("q1", OptionKey::A), ("q2", OptionKey::C), ("q3", OptionKey::B)] {
        session.answer(id, key).unwrap();
    }

    assert!(session.all_answered());
    assert_eq!(session.score(), Score { correct: 3, total: 3 });
}

#[test]
fn elapsed_time_is_measured_from_start() {
    let started = Utc::now() - Duration::seconds(90);
    let session = Session::started_at(sample_vignette(), started);

    assert_eq!(session.start_time(), started);
    assert!(session.elapsed() >= Duration::seconds(90));
}

#[test]
fn vignette_json_fixture_matches_expected_answers() {
    let vignette = sample_vignette();
    let answers: Vec<_> = vignette.questions().iter().map(|q| q.correct_answer()).collect();
    assert_eq!(answers, vec![OptionKey::A, OptionKey::C, OptionKey::B]);
    assert_eq!(vignette_json()["questions"][0]["id"], json!("q1"));
}
