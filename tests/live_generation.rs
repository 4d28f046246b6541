
use vignette_quiz::sanitizer::FORBIDDEN_MARKER;
use vignette_quiz::schema::{OptionKey, Topic};
use vignette_quiz::VignetteGenerator;

use crate::test_utils::{create_live_client, init_test_logging, should_skip_live_tests};

#[tokio::test]
async fn live_vignette_is_well_formed() {
    init_test_logging();
    if should_skip_live_tests() {
        println!("Skipping live test: set TEST_CLIENT to gemini, claude or deepseek");
        return;
    }

    let generator = VignetteGenerator::new(create_live_client());
    let vignette = generator.generate(Topic::Fsa).await.expect("live generation");

    assert_eq!(vignette.topic(), Topic::Fsa);
    assert_eq!(vignette.questions().len(), 3);
    assert!(!vignette.context().contains(FORBIDDEN_MARKER));
    for question in vignette.questions() {
        for key in OptionKey::ALL {
            assert!(!question.option(key).trim().is_empty());
        }
    }
}
