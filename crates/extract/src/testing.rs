//! Deterministic language model for tests.
//!
//! Replies are scripted per call kind: JSON-mode calls (structured
//! extraction) and plain calls (summaries) have separate queues. Once a queue
//! runs dry the model answers with an empty opportunity list or a fixed
//! summary.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::{CompletionRequest, LanguageModel};

pub const DEFAULT_SUMMARY: &str = "Scripted summary.";
pub const EMPTY_OPPORTUNITIES: &str = r#"{"opportunities": []}"#;

#[derive(Default)]
pub struct ScriptedModel {
    json_replies: Mutex<VecDeque<Result<String, String>>>,
    text_replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next JSON-mode call.
    pub fn json(self, reply: impl Into<String>) -> Self {
        push(&self.json_replies, Ok(reply.into()));
        self
    }

    /// Queue a transport failure for the next JSON-mode call.
    pub fn json_failure(self, message: impl Into<String>) -> Self {
        push(&self.json_replies, Err(message.into()));
        self
    }

    /// Queue a reply for the next plain-text call.
    pub fn summary(self, reply: impl Into<String>) -> Self {
        push(&self.text_replies, Ok(reply.into()));
        self
    }

    pub fn summary_failure(self, message: impl Into<String>) -> Self {
        push(&self.text_replies, Err(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn json_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.json_mode).count()
    }
}

fn push(queue: &Mutex<VecDeque<Result<String, String>>>, reply: Result<String, String>) {
    if let Ok(mut queue) = queue.lock() {
        queue.push_back(reply);
    }
}

fn pop(queue: &Mutex<VecDeque<Result<String, String>>>) -> Option<Result<String, String>> {
    queue.lock().ok().and_then(|mut q| q.pop_front())
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        let (queue, fallback) = if request.json_mode {
            (&self.json_replies, EMPTY_OPPORTUNITIES)
        } else {
            (&self.text_replies, DEFAULT_SUMMARY)
        };

        match pop(queue) {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(fallback.to_string()),
        }
    }
}
