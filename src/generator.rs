//! Vignette generation: prompt construction, the single outbound call, and
//! the parse → sanitize → validate pipeline.
//!
//! Every failure along the way collapses into [`GenerationFailure`]; a caller
//! either gets a complete [`Vignette`] or nothing.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::core::{GenerationRequest, LowLevelClient};
use crate::error::{GenerationCause, GenerationFailure};
use crate::interceptors::Interceptor;
use crate::json_utils::object_candidates;
use crate::sanitizer::sanitize;
use crate::schema::{response_schema, Topic, Vignette, QUESTIONS_PER_VIGNETTE};

/// Turns a [`Topic`] into a validated, sanitized [`Vignette`].
#[derive(Debug, Clone)]
pub struct VignetteGenerator<C: LowLevelClient> {
    client: C,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl<C: LowLevelClient> VignetteGenerator<C> {
    pub fn new(client: C) -> Self {
        info!("Creating new VignetteGenerator");
        Self { client, interceptor: None }
    }

    /// Record every exchange through `interceptor`.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The instruction sent for `topic`.
    pub fn build_prompt(&self, topic: Topic) -> String {
        build_prompt(topic)
    }

    /// One attempt at producing a vignette for `topic`. No retry.
    #[instrument(target = "vignette_quiz::generator", skip(self, topic), fields(topic = %topic))]
    pub async fn generate(&self, topic: Topic) -> Result<Vignette, GenerationFailure> {
        let prompt = build_prompt(topic);
        info!(prompt_len = prompt.len(), "Requesting vignette");

        let request = GenerationRequest::new(prompt.clone(), response_schema());
        let raw = self.client.ask_raw(request).await;

        if let Some(interceptor) = &self.interceptor {
            let recorded = match &raw {
                Ok(text) => text.clone(),
                Err(e) => format!("ERROR: {}", e),
            };
            if let Err(e) = interceptor.save(topic, &prompt, &recorded).await {
                warn!(error = %e, "Failed to record generation exchange");
            }
        }

        let result = raw
            .map_err(GenerationCause::from)
            .and_then(|text| parse_vignette(&text, topic));

        match result {
            Ok(vignette) => {
                info!(title = %vignette.title(), "Vignette generated");
                Ok(vignette)
            }
            Err(cause) => {
                error!(error = %cause, "Vignette generation failed");
                Err(GenerationFailure::new(cause))
            }
        }
    }
}

/// Parse a raw payload into a vignette for `topic`.
///
/// The payload may be bare JSON or JSON embedded in surrounding text. Every
/// object found is tried in order, outer before nested, and the first one
/// that validates wins. Strings are sanitized before validation, so a field
/// that consisted only of markers is rejected as empty.
pub fn parse_vignette(raw: &str, topic: Topic) -> Result<Vignette, GenerationCause> {
    let candidates = object_candidates(raw);
    debug!(candidates = candidates.len(), "Scanning payload for vignette objects");

    let mut first_error: Option<GenerationCause> = None;
    for json in candidates {
        let attempt = serde_json::from_str::<Value>(json)
            .map_err(|e| GenerationCause::JsonDeserialization(e, truncate(raw, 200)))
            .and_then(|value| Vignette::from_value(sanitize(&value), topic).map_err(GenerationCause::from));

        match attempt {
            Ok(vignette) => {
                debug!(payload_len = json.len(), "Payload parsed and sanitized");
                return Ok(vignette);
            }
            Err(e) => {
                // a schema violation says more than a stray non-JSON brace
                let replace = match &first_error {
                    None => true,
                    Some(GenerationCause::JsonDeserialization(..)) => matches!(e, GenerationCause::Schema(_)),
                    Some(_) => false,
                };
                if replace {
                    first_error = Some(e);
                }
            }
        }
    }

    Err(first_error.unwrap_or(GenerationCause::NoJsonFound))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Instruction for a level-2 style item set on `topic`.
pub fn build_prompt(topic: Topic) -> String {
    format!(
        r#"Generate a high-quality CFA Level 2 style vignette for the topic: {topic}.

The vignette context should be a professional case study (400-600 words).
IMPORTANT: For any financial data, ratios, or balance sheet info, you MUST use standard GitHub Flavored Markdown (GFM) tables.

Table Rules:
1. Every table must be preceded by a label like "Exhibit 1: [Description]".
2. Tables must use the pipe and hyphen syntax:
   | Column 1 | Column 2 |
   |----------|----------|
   | Data 1   | Data 2   |
3. Ensure there is a blank line BEFORE and AFTER every table.
4. Do NOT use plain text spaces to align columns; use the pipe syntax properly.

Question Rules:
- Create exactly {count} multiple-choice questions with options A, B and C.
- Questions should be vignette-based (Item Set format).
- Focus on calculation, application, and analysis.
- Provide a detailed explanation for each correct answer and why the distractors are incorrect.

NO MARKDOWN BOLDING: Do not use double asterisks (**) for bolding text in paragraphs or questions. Use plain text for emphasis or capitalization if needed."#,
        topic = topic.display_name(),
        count = QUESTIONS_PER_VIGNETTE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_covers_tables_questions_and_bolding() {
        let prompt = build_prompt(Topic::Derivatives);
        assert!(prompt.contains("topic: Derivatives."));
        assert!(prompt.contains("Exhibit 1:"));
        assert!(prompt.contains("blank line BEFORE and AFTER"));
        assert!(prompt.contains("exactly 3 multiple-choice questions"));
        assert!(prompt.contains("calculation, application, and analysis"));
        assert!(prompt.contains("NO MARKDOWN BOLDING"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
