//! Scripted model for tests.
//!
//! [`RecordingModel`] answers with predefined replies and records every call
//! it receives, so tests can check which call shape reached the model without
//! any network access.

use crate::model::{Content, ContentMode, GenerativeModel};
use std::sync::{Arc, Mutex};

/// Error returned by a [`RecordingModel`] scripted to fail.
#[derive(Debug, Clone, thiserror::Error)]
#[error("mock model failure: {0}")]
pub struct MockError(pub String);

/// One call observed by a [`RecordingModel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub mode: ContentMode,
    pub prompt: Option<String>,
    pub mime_type: &'static str,
    pub image_len: usize,
}

/// A model that cycles through predefined replies.
///
/// Clones share the same call log, so a clone kept by the test still sees
/// the calls made after the original moved into an engine.
#[derive(Clone, Debug)]
pub struct RecordingModel {
    model_id: String,
    replies: Vec<Result<String, String>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingModel {
    pub fn new(replies: Vec<String>) -> Self {
        Self::scripted(replies.into_iter().map(Ok).collect())
    }

    /// A model whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::scripted(vec![Err(message.into())])
    }

    /// Replies in order, wrapping around; `Err` entries become [`MockError`]s.
    pub fn scripted(replies: Vec<Result<String, String>>) -> Self {
        Self {
            model_id: "mock-model".to_string(),
            replies,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Snapshot of the calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl GenerativeModel for RecordingModel {
    type Error = MockError;

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate_content(&mut self, content: Content) -> Result<String, Self::Error> {
        let index = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| MockError("call log poisoned".to_string()))?;
            calls.push(RecordedCall {
                mode: content.mode(),
                prompt: content.prompt().map(str::to_string),
                mime_type: content.image().mime_type(),
                image_len: content.image().bytes().len(),
            });
            calls.len() - 1
        };

        if self.replies.is_empty() {
            return Ok("No response".to_string());
        }
        self.replies[index % self.replies.len()]
            .clone()
            .map_err(MockError)
    }
}
