//! Test doubles for the external capabilities
//!
//! The label service and the chat model are replaced by in-process fakes
//! so the end-to-end tests never touch the network.

use async_trait::async_trait;
use oruby_drawing_server::agent::{
    CompletionOptions, CompletionResponse, LlmError, LlmProvider, Message,
};
use oruby_drawing_server::analysis::Label;
use oruby_drawing_server::vision::{LabelSource, LabelSourceError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Label source returning a fixed list for every image.
pub struct StaticLabels(pub Vec<Label>);

#[async_trait]
impl LabelSource for StaticLabels {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<Label>, LabelSourceError> {
        Ok(self.0.clone())
    }
}

/// Labels that trip every feature flag.
#[allow(dead_code)]
pub fn scenario_b_labels() -> Vec<Label> {
    vec![
        Label::new("bird-like mascot", 92.0),
        Label::new("gem ornament", 88.0),
        Label::new("illustration", 81.0),
    ]
}

/// Chat model that always errors.
#[allow(dead_code)]
pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-1"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::Api {
            status: 500,
            message: "model unavailable".to_string(),
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Err(LlmError::Connection("unreachable".to_string()))
    }
}

/// Chat model answering from a script, one reply per call.
#[allow(dead_code)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
}

#[allow(dead_code)]
impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => Ok(CompletionResponse::text(reply)),
            None => Err(LlmError::Connection("script exhausted".to_string())),
        }
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}
