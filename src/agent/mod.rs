//! Generative-model backends used by the evaluation and advice agents.

pub mod llm;

pub use llm::{
    ApiKeySource, CompletionOptions, CompletionResponse, LlmError, LlmProvider, Message,
    MessageRole, OllamaProvider, OpenAIProvider,
};
