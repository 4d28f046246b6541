use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::core::{GenerationRequest, LowLevelClient};
use crate::error::AIError;

/// Mock client that always answers with an empty JSON object
#[derive(Debug, Clone, Default)]
pub struct MockVoid;

#[async_trait]
impl LowLevelClient for MockVoid {
    async fn ask_raw(&self, _request: GenerationRequest) -> Result<String, AIError> {
        Ok("{}".to_string())
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

/// A scripted reply for [`MockClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Raw payload text handed back as the model output
    Success(String),
    /// Transport or service failure
    Error(String),
}

impl MockResponse {
    pub fn json(value: &serde_json::Value) -> Self {
        Self::Success(value.to_string())
    }
}

/// Shared control surface for a [`MockClient`]: queue replies, inspect the
/// requests the client received.
#[derive(Debug, Default)]
pub struct MockHandle {
    responses: Mutex<VecDeque<MockResponse>>,
    fallback: Mutex<Option<MockResponse>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockHandle {
    pub fn push(&self, response: MockResponse) {
        locked(&self.responses).push_back(response);
    }

    pub fn push_many(&self, responses: impl IntoIterator<Item = MockResponse>) {
        locked(&self.responses).extend(responses);
    }

    /// Reply used once the queue is exhausted.
    pub fn set_fallback(&self, response: MockResponse) {
        *locked(&self.fallback) = Some(response);
    }

    pub fn remaining(&self) -> usize {
        locked(&self.responses).len()
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        locked(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        locked(&self.requests).len()
    }

    fn next(&self, request: GenerationRequest) -> Option<MockResponse> {
        locked(&self.requests).push(request);
        let queued = locked(&self.responses).pop_front();
        queued.or_else(|| locked(&self.fallback).clone())
    }
}

/// Mock client replaying queued [`MockResponse`]s in order.
///
/// With the queue empty it answers with the fallback, or an error if none is set.
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = Self::new();
        handle.push_many(responses);
        (client, handle)
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, request: GenerationRequest) -> Result<String, AIError> {
        debug!(prompt_len = request.prompt.len(), "Mock client received request");
        match self.handle.next(request) {
            Some(MockResponse::Success(text)) => Ok(text),
            Some(MockResponse::Error(message)) => Err(AIError::Mock(message)),
            None => Err(AIError::Mock("no mock responses queued".to_string())),
        }
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
