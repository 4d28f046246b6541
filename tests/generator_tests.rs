
use std::sync::Arc;

use serde_json::json;
use vignette_quiz::clients::{MockResponse, MockVoid};
use vignette_quiz::error::{GenerationCause, SchemaViolation};
use vignette_quiz::interceptors::FileInterceptor;
use vignette_quiz::sanitizer::FORBIDDEN_MARKER;
use vignette_quiz::schema::{response_schema, OptionKey, Topic};
use vignette_quiz::VignetteGenerator;

use crate::test_utils::{init_test_logging, mock_generator, ok_response, vignette_json};

#[tokio::test]
async fn generates_sanitized_vignette() {
    init_test_logging();
    let (generator, handle) = mock_generator();
    handle.push(ok_response());

    let vignette = generator.generate(Topic::Fsa).await.unwrap();

    assert_eq!(vignette.title(), "Northwind Capital");
    assert!(vignette.context().contains("| ROE | 12% |"));
    assert_eq!(vignette.questions().len(), 3);
    for question in vignette.questions() {
        assert!(!question.question_text().contains(FORBIDDEN_MARKER));
        assert!(!question.explanation().contains(FORBIDDEN_MARKER));
        for key in OptionKey::ALL {
            assert!(!question.option(key).is_empty());
        }
    }
}

#[tokio::test]
async fn sends_prompt_and_declared_schema_once() {
    let (generator, handle) = mock_generator();
    handle.push(ok_response());

    generator.generate(Topic::Ethics).await.unwrap();

    let requests = handle.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].prompt.contains("Ethical and Professional Standards"));
    assert_eq!(requests[0].response_schema, response_schema());
}

#[tokio::test]
async fn topic_drift_is_overridden() {
    let (generator, handle) = mock_generator();
    let mut payload = vignette_json();
    payload["topic"] = json!("Portfolio Management");
    handle.push(MockResponse::json(&payload));

    let vignette = generator.generate(Topic::Corporate).await.unwrap();
    assert_eq!(vignette.topic(), Topic::Corporate);
}

#[tokio::test]
async fn json_wrapped_in_prose_is_accepted() {
    let (generator, handle) = mock_generator();
    handle.push(MockResponse::Success(format!(
        "Sure! Here is the case:\n```json\n{}\n```",
        vignette_json()
    )));

    assert!(generator.generate(Topic::Fsa).await.is_ok());
}

#[tokio::test]
async fn stray_braces_before_payload_are_skipped() {
    let (generator, handle) = mock_generator();
    handle.push_many([
        MockResponse::Success(format!(
            "Here is the vignette {{as requested}}:\n```json\n{}\n```",
            vignette_json()
        )),
        MockResponse::Success(format!("Use the form {{title, ...\n{}", vignette_json())),
    ]);

    let first = generator.generate(Topic::Fsa).await.unwrap();
    let second = generator.generate(Topic::Fsa).await.unwrap();
    assert_eq!(first.title(), "Northwind Capital");
    assert_eq!(first, second);
}

#[tokio::test]
async fn schema_error_is_reported_over_stray_braces() {
    let (generator, handle) = mock_generator();
    let mut payload = vignette_json();
    payload["questions"].as_array_mut().unwrap().pop();
    handle.push(MockResponse::Success(format!("{{note}} {}", payload)));

    let failure = generator.generate(Topic::Fsa).await.unwrap_err();
    assert!(matches!(
        failure.cause(),
        GenerationCause::Schema(SchemaViolation::QuestionCount { expected: 3, actual: 2 })
    ));
}

#[tokio::test]
async fn transport_error_is_a_generation_failure() {
    let (generator, handle) = mock_generator();
    handle.push(MockResponse::Error("connection reset".to_string()));

    let failure = generator.generate(Topic::Fsa).await.unwrap_err();
    assert!(matches!(failure.cause(), GenerationCause::Ai(_)));
    // no retry
    assert_eq!(handle.call_count(), 1);
}

#[tokio::test]
async fn unparseable_payload_is_a_generation_failure() {
    let (generator, handle) = mock_generator();
    handle.push(MockResponse::Success("{\"title\": \"x\", oops}".to_string()));

    let failure = generator.generate(Topic::Fsa).await.unwrap_err();
    assert!(matches!(failure.cause(), GenerationCause::JsonDeserialization(..)));
}

#[tokio::test]
async fn non_json_payload_is_a_generation_failure() {
    let (generator, handle) = mock_generator();
    handle.push(MockResponse::Success("I cannot help with that.".to_string()));

    let failure = generator.generate(Topic::Fsa).await.unwrap_err();
    assert!(matches!(failure.cause(), GenerationCause::NoJsonFound));
}

#[tokio::test]
async fn empty_object_violates_schema() {
    let generator = VignetteGenerator::new(MockVoid);

    let failure = generator.generate(Topic::Fsa).await.unwrap_err();
    assert!(matches!(failure.cause(), GenerationCause::Schema(SchemaViolation::Shape(_))));
}

#[tokio::test]
async fn field_made_only_of_markers_is_rejected() {
    let (generator, handle) = mock_generator();
    let mut payload = vignette_json();
    payload["title"] = json!("****");
    handle.push(MockResponse::json(&payload));

    let failure = generator.generate(Topic::Fsa).await.unwrap_err();
    assert!(matches!(
        failure.cause(),
        GenerationCause::Schema(SchemaViolation::EmptyField(field)) if field == "title"
    ));
}

#[tokio::test]
async fn interceptor_records_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let (generator, handle) = mock_generator();
    let generator = generator.with_interceptor(Arc::new(FileInterceptor::new(dir.path())));
    handle.push(ok_response());

    generator.generate(Topic::Derivatives).await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let path = entries[0].as_ref().unwrap().path();
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("vignette_derivatives_"));
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("# Prompt"));
    assert!(content.contains("**Northwind** Capital"));
}

#[tokio::test]
async fn interceptor_failure_does_not_fail_generation() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let (generator, handle) = mock_generator();
    // a directory cannot be created under a regular file
    let interceptor = FileInterceptor::new(blocker.path().join("transcripts"));
    let generator = generator.with_interceptor(Arc::new(interceptor));
    handle.push(ok_response());

    let vignette = generator.generate(Topic::Fsa).await.unwrap();
    assert_eq!(vignette.questions().len(), 3);
}
