//! Vignette data contract: the shape the model must produce, the declared
//! output schema sent along with every request, and the parse-or-fail
//! boundary that turns a raw payload into a [`Vignette`].
//!
//! A [`Vignette`] can only be obtained through [`Vignette::new`] or
//! [`Vignette::from_value`], both of which enforce the invariants, so the rest
//! of the crate trusts it without further checks.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use crate::error::SchemaViolation;

/// Number of questions every vignette carries.
pub const QUESTIONS_PER_VIGNETTE: usize = 3;

/// Exam subject areas a vignette can be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Topic {
    #[serde(rename = "Ethical and Professional Standards")]
    Ethics,
    #[serde(rename = "Quantitative Methods")]
    Quants,
    #[serde(rename = "Economics")]
    Economics,
    #[serde(rename = "Financial Statement Analysis")]
    Fsa,
    #[serde(rename = "Corporate Issuers")]
    Corporate,
    #[serde(rename = "Equity Valuation")]
    Equity,
    #[serde(rename = "Fixed Income")]
    FixedIncome,
    #[serde(rename = "Derivatives")]
    Derivatives,
    #[serde(rename = "Alternative Investments")]
    Alternatives,
    #[serde(rename = "Portfolio Management")]
    Portfolio,
}

impl Topic {
    /// Every topic, in menu order.
    pub const ALL: [Topic; 10] = [
        Topic::Ethics,
        Topic::Quants,
        Topic::Economics,
        Topic::Fsa,
        Topic::Corporate,
        Topic::Equity,
        Topic::FixedIncome,
        Topic::Derivatives,
        Topic::Alternatives,
        Topic::Portfolio,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ethics => "Ethical and Professional Standards",
            Self::Quants => "Quantitative Methods",
            Self::Economics => "Economics",
            Self::Fsa => "Financial Statement Analysis",
            Self::Corporate => "Corporate Issuers",
            Self::Equity => "Equity Valuation",
            Self::FixedIncome => "Fixed Income",
            Self::Derivatives => "Derivatives",
            Self::Alternatives => "Alternative Investments",
            Self::Portfolio => "Portfolio Management",
        }
    }

    /// Short selector used on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ethics => "ethics",
            Self::Quants => "quants",
            Self::Economics => "economics",
            Self::Fsa => "fsa",
            Self::Corporate => "corporate",
            Self::Equity => "equity",
            Self::FixedIncome => "fixed-income",
            Self::Derivatives => "derivatives",
            Self::Alternatives => "alternatives",
            Self::Portfolio => "portfolio",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown topic `{0}`")]
pub struct UnknownTopic(pub String);

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for Topic {
    type Err = UnknownTopic;

    /// Accepts the short key or the display name, ignoring case and separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Topic::ALL
            .into_iter()
            .find(|t| normalize(t.key()) == wanted || normalize(t.display_name()) == wanted)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// One of the three answer choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum OptionKey {
    A,
    B,
    C,
}

impl OptionKey {
    pub const ALL: [OptionKey; 3] = [OptionKey::A, OptionKey::B, OptionKey::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not one of A, B, C")]
pub struct UnknownOption(pub String);

impl FromStr for OptionKey {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            _ => Err(UnknownOption(s.to_string())),
        }
    }
}

/// The three answer texts of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Options {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
}

impl Options {
    pub fn get(&self, key: OptionKey) -> &str {
        match key {
            OptionKey::A => &self.a,
            OptionKey::B => &self.b,
            OptionKey::C => &self.c,
        }
    }
}

/// A multiple-choice question within a vignette
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Identifier, unique within the vignette
    id: String,
    /// Question stem, markdown
    question_text: String,
    options: Options,
    correct_answer: OptionKey,
    /// Why the correct answer is right and the distractors are wrong
    explanation: String,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        question_text: impl Into<String>,
        options: Options,
        correct_answer: OptionKey,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question_text: question_text.into(),
            options,
            correct_answer,
            explanation: explanation.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn option(&self, key: OptionKey) -> &str {
        self.options.get(key)
    }

    pub fn correct_answer(&self) -> OptionKey {
        self.correct_answer
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn is_correct(&self, key: OptionKey) -> bool {
        self.correct_answer == key
    }

    fn check_non_empty(&self, index: usize) -> Result<(), SchemaViolation> {
        let fields = [
            ("id", self.id.as_str()),
            ("questionText", self.question_text.as_str()),
            ("options.A", self.options.a.as_str()),
            ("options.B", self.options.b.as_str()),
            ("options.C", self.options.c.as_str()),
            ("explanation", self.explanation.as_str()),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(SchemaViolation::EmptyField(format!("questions[{}].{}", index, name)));
            }
        }
        Ok(())
    }
}

/// Generated case study: a narrative plus its questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vignette {
    title: String,
    topic: Topic,
    context: String,
    questions: Vec<Question>,
}

/// The exact payload shape requested from the model.
///
/// `topic` is free text on the wire; the validated vignette always carries
/// the topic that was asked for.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "Vignette", description = "A case study with exactly three multiple-choice questions")]
pub struct VignettePayload {
    pub title: String,
    pub topic: String,
    /// The full case study context with GFM tables for financial exhibits.
    pub context: String,
    #[schemars(length(min = 3, max = 3))]
    pub questions: Vec<Question>,
}

impl Vignette {
    /// Build a vignette, enforcing question count, non-empty text and unique ids.
    pub fn new(
        title: impl Into<String>,
        topic: Topic,
        context: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, SchemaViolation> {
        let vignette = Self {
            title: title.into(),
            topic,
            context: context.into(),
            questions,
        };
        vignette.validate()?;
        Ok(vignette)
    }

    /// Parse-or-fail boundary for a raw payload.
    ///
    /// The payload's own `topic` is replaced by `requested`.
    pub fn from_value(value: Value, requested: Topic) -> Result<Self, SchemaViolation> {
        let payload: VignettePayload =
            serde_json::from_value(value).map_err(|e| SchemaViolation::Shape(e.to_string()))?;

        if payload.topic.parse::<Topic>().ok() != Some(requested) {
            warn!(requested = %requested, returned = %payload.topic, "Model returned a different topic; using the requested one");
        }

        Self::new(payload.title, requested, payload.context, payload.questions)
    }

    fn validate(&self) -> Result<(), SchemaViolation> {
        if self.title.trim().is_empty() {
            return Err(SchemaViolation::EmptyField("title".to_string()));
        }
        if self.context.trim().is_empty() {
            return Err(SchemaViolation::EmptyField("context".to_string()));
        }
        if self.questions.len() != QUESTIONS_PER_VIGNETTE {
            return Err(SchemaViolation::QuestionCount {
                expected: QUESTIONS_PER_VIGNETTE,
                actual: self.questions.len(),
            });
        }

        let mut seen = HashSet::new();
        for (i, question) in self.questions.iter().enumerate() {
            question.check_non_empty(i)?;
            if !seen.insert(question.id.as_str()) {
                return Err(SchemaViolation::DuplicateQuestionId(question.id.clone()));
            }
        }
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Strict output shape in the generation service's schema dialect.
pub fn response_schema() -> Value {
    let string = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "title": string,
            "topic": string,
            "context": {
                "type": "STRING",
                "description": "The full case study context with GFM tables for financial exhibits."
            },
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": string,
                        "questionText": string,
                        "options": {
                            "type": "OBJECT",
                            "properties": { "A": string, "B": string, "C": string },
                            "required": ["A", "B", "C"]
                        },
                        "correctAnswer": { "type": "STRING", "enum": ["A", "B", "C"] },
                        "explanation": string
                    },
                    "required": ["id", "questionText", "options", "correctAnswer", "explanation"]
                }
            }
        },
        "required": ["title", "topic", "context", "questions"]
    })
}

/// JSON Schema of [`VignettePayload`], for providers that only take guidance
/// through the prompt.
pub fn guidance_schema() -> String {
    let schema = schema_for!(VignettePayload);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "Schema serialization failed".to_string())
}
