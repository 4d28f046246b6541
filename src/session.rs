//! Quiz lifecycle: select topic → answer → submit → review → reset.
//!
//! [`Quiz`] is the only owner of mutable quiz state. Every transition takes
//! `&mut self`, so at most one generation can be in flight and there is a
//! single writer at any time.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::core::LowLevelClient;
use crate::error::{GenerationFailure, SessionError};
use crate::generator::VignetteGenerator;
use crate::schema::{OptionKey, Question, Topic, Vignette};

/// Shown to the user whenever a generation attempt fails.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate vignette. Please try again or check your API configuration.";

/// One attempt at one vignette.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    vignette: Vignette,
    answers: HashMap<String, OptionKey>,
    complete: bool,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(vignette: Vignette) -> Self {
        Self::started_at(vignette, Utc::now())
    }

    pub fn started_at(vignette: Vignette, started_at: DateTime<Utc>) -> Self {
        Self {
            vignette,
            answers: HashMap::new(),
            complete: false,
            started_at,
        }
    }

    pub fn vignette(&self) -> &Vignette {
        &self.vignette
    }

    pub fn answers(&self) -> &HashMap<String, OptionKey> {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<OptionKey> {
        self.answers.get(question_id).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.started_at
    }

    /// Record or overwrite the answer to one question.
    pub fn answer(&mut self, question_id: &str, key: OptionKey) -> Result<(), SessionError> {
        if self.complete {
            return Err(SessionError::AnswersFrozen);
        }
        if self.vignette.question(question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }
        self.answers.insert(question_id.to_string(), key);
        Ok(())
    }

    /// Freeze the answers. Unanswered questions simply count as wrong.
    pub fn submit(&mut self) {
        self.complete = true;
    }

    pub fn answered_count(&self) -> usize {
        self.vignette
            .questions()
            .iter()
            .filter(|q| self.answers.contains_key(q.id()))
            .count()
    }

    /// Whether every question has an answer; front ends gate submission on it.
    pub fn all_answered(&self) -> bool {
        self.answered_count() == self.vignette.questions().len()
    }

    pub fn outcome(&self, question: &Question) -> QuestionOutcome {
        match self.answer_for(question.id()) {
            None => QuestionOutcome::Unanswered,
            Some(key) if question.is_correct(key) => QuestionOutcome::Correct,
            Some(key) => QuestionOutcome::Incorrect { chosen: key },
        }
    }

    /// Questions paired with how they were answered, in vignette order.
    pub fn review(&self) -> Vec<(&Question, QuestionOutcome)> {
        self.vignette
            .questions()
            .iter()
            .map(|q| (q, self.outcome(q)))
            .collect()
    }

    pub fn score(&self) -> Score {
        let correct = self
            .review()
            .iter()
            .filter(|(_, outcome)| *outcome == QuestionOutcome::Correct)
            .count();
        Score { correct, total: self.vignette.questions().len() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOutcome {
    Correct,
    Incorrect { chosen: OptionKey },
    Unanswered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.correct, self.total)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuizState {
    /// No quiz in progress; carries the message of the last failed generation.
    NoSession { error: Option<String> },
    Loading { topic: Topic },
    Active(Session),
    Complete(Session),
}

impl QuizState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoSession { .. } => "no session",
            Self::Loading { .. } => "loading",
            Self::Active(_) => "active",
            Self::Complete(_) => "complete",
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Active(session) | Self::Complete(session) => Some(session),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::NoSession { error } => error.as_deref(),
            _ => None,
        }
    }
}

impl Default for QuizState {
    fn default() -> Self {
        Self::NoSession { error: None }
    }
}

/// The quiz state machine, driving a [`VignetteGenerator`].
#[derive(Debug)]
pub struct Quiz<C: LowLevelClient> {
    generator: VignetteGenerator<C>,
    state: QuizState,
}

impl<C: LowLevelClient> Quiz<C> {
    pub fn new(generator: VignetteGenerator<C>) -> Self {
        Self { generator, state: QuizState::default() }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session()
    }

    pub fn generator(&self) -> &VignetteGenerator<C> {
        &self.generator
    }

    /// Generate a vignette for `topic` and start a session on it.
    ///
    /// Generation failures are absorbed: the quiz goes back to
    /// [`QuizState::NoSession`] with a message. Only a transition that is not
    /// allowed from the current state is returned as an error.
    pub async fn select_topic(&mut self, topic: Topic) -> Result<(), SessionError> {
        self.begin_loading(topic)?;
        let result = self.generator.generate(topic).await;
        self.finish_loading(result)
    }

    /// Regenerate the topic of a completed session.
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        let topic = match &self.state {
            QuizState::Complete(session) => session.vignette().topic(),
            other => {
                return Err(SessionError::InvalidTransition { action: "refresh", state: other.name() })
            }
        };
        self.select_topic(topic).await
    }

    /// First half of topic selection: `NoSession | Complete -> Loading`.
    pub fn begin_loading(&mut self, topic: Topic) -> Result<(), SessionError> {
        if !matches!(self.state, QuizState::NoSession { .. } | QuizState::Complete(_)) {
            return Err(SessionError::InvalidTransition {
                action: "select a topic",
                state: self.state.name(),
            });
        }
        debug!(topic = %topic, from = self.state.name(), "Loading vignette");
        self.state = QuizState::Loading { topic };
        Ok(())
    }

    /// Second half of topic selection: `Loading -> Active | NoSession`.
    pub fn finish_loading(&mut self, result: Result<Vignette, GenerationFailure>) -> Result<(), SessionError> {
        if !matches!(self.state, QuizState::Loading { .. }) {
            return Err(SessionError::InvalidTransition {
                action: "finish loading",
                state: self.state.name(),
            });
        }

        self.state = match result {
            Ok(vignette) => {
                info!(title = %vignette.title(), "Session started");
                QuizState::Active(Session::new(vignette))
            }
            Err(e) => {
                warn!(error = %e, cause = %e.cause(), "Generation failed, returning to topic selection");
                QuizState::NoSession { error: Some(GENERATION_FAILED_MESSAGE.to_string()) }
            }
        };
        Ok(())
    }

    /// Record an answer. Only valid while the session is active.
    pub fn answer(&mut self, question_id: &str, key: OptionKey) -> Result<(), SessionError> {
        match &mut self.state {
            QuizState::Active(session) => session.answer(question_id, key),
            QuizState::Complete(_) => Err(SessionError::AnswersFrozen),
            _ => Err(SessionError::NoActiveSession),
        }
    }

    /// `Active -> Complete`. Returns the score of the submitted session.
    pub fn submit(&mut self) -> Result<Score, SessionError> {
        match std::mem::take(&mut self.state) {
            QuizState::Active(mut session) => {
                session.submit();
                let score = session.score();
                info!(score = %score, "Session submitted");
                self.state = QuizState::Complete(session);
                Ok(score)
            }
            other => {
                let err = SessionError::InvalidTransition { action: "submit", state: other.name() };
                self.state = other;
                Err(err)
            }
        }
    }

    /// Any state -> `NoSession`, dropping the session and any error.
    pub fn reset(&mut self) {
        debug!(from = self.state.name(), "Resetting quiz");
        self.state = QuizState::default();
    }
}
