use crate::errors::Error;
use crate::llm::providers::LlmProvider;
use crate::llm::ChatMessage;
use tracing::{debug, info};

/// Generic LLM client that delegates work to a concrete provider.
#[derive(Debug)]
pub struct LlmClient {
    provider: Box<dyn LlmProvider>,
}

impl LlmClient {
    /// Creates a new LLM client with the specified provider and model.
    ///
    /// # Arguments
    /// * `provider_name` - Name of the LLM provider ("openai" or "ollama")
    /// * `model` - Model name to use with the provider
    pub fn new(provider_name: &str, model: &str) -> Result<Self, Error> {
        let provider: Box<dyn LlmProvider> = match provider_name {
            "openai" => Box::new(crate::llm::providers::openai::OpenAiProvider::new(model)?),
            "ollama" => Box::new(crate::llm::providers::ollama::OllamaProvider::new(model)?),
            _ => {
                return Err(Error::Config(format!(
                    "Unknown LLM provider '{}'",
                    provider_name
                )))
            }
        };

        Ok(LlmClient { provider })
    }

    pub fn with_provider(provider: Box<dyn LlmProvider>) -> Self {
        LlmClient { provider }
    }

    pub async fn call_llm_api(&self, messages: Vec<ChatMessage>, json_mode: bool) -> Result<String, Error> {
        self.provider.call_llm_api(messages, json_mode).await
    }

    /// Calls the LLM in JSON mode, re-asking with `format_reminder` until
    /// `validate_response` accepts the answer or `max_retries` attempts are used.
    pub async fn call_llm_with_format_check<F>(
        &self,
        messages: &mut Vec<ChatMessage>,
        validate_response: F,
        format_reminder: &str,
        max_retries: usize,
    ) -> Result<String, Error>
    where
        F: Fn(&str) -> bool,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let response = self.call_llm_api(messages.clone(), true).await?;
            debug!("LLM response: {}", response);

            if validate_response(&response) {
                return Ok(response);
            } else if attempts >= max_retries {
                info!(
                    "LLM did not follow the format after {} attempts, response: {}",
                    max_retries, response
                );
                return Err(Error::InvalidFormat(max_retries));
            } else {
                messages.push(ChatMessage::new("assistant", &response));
                let retry_message = format!(
                    "Your last answer did not follow the required format.\n\
                     {} \n\
                     Please provide a new answer following exactly these formatting rules.",
                    format_reminder
                );
                messages.push(ChatMessage::user(&retry_message));
            }
        }
    }
}
