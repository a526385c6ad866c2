use crate::errors::Error;
use crate::llm::ChatMessage;
use async_trait::async_trait;
use std::fmt::Debug;

pub mod ollama;
pub mod openai;

/// Chat completion backend
#[async_trait]
pub trait LlmProvider: Debug + Send + Sync {
    /// Sends the conversation and returns the assistant's text.
    /// With `json_mode` the provider asks the model for a bare JSON object.
    async fn call_llm_api(&self, messages: Vec<ChatMessage>, json_mode: bool) -> Result<String, Error>;
}
