use super::LlmProvider;
use crate::errors::Error;
use crate::llm::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Provider implementation for OpenAI's chat completions API
#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client,
    /// OpenAI API key loaded from environment
    api_key: String,
    /// Model identifier to use (e.g. "gpt-4o-mini")
    model: String,
}

impl OpenAiProvider {
    /// Creates a provider, failing if `OPENAI_API_KEY` is not set
    pub fn new(model: &str) -> Result<Self, Error> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| Error::MissingEnv("OPENAI_API_KEY"))?;
        Ok(OpenAiProvider {
            client: Client::new(),
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn call_llm_api(&self, messages: Vec<ChatMessage>, json_mode: bool) -> Result<String, Error> {
        let mut request_body = json!({
          "model": self.model,
          "messages": messages,
          "temperature": 0.2
        });
        if json_mode {
            request_body["response_format"] = json!({ "type": "json_object" });
        }

        let res = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !res.status().is_success() {
            let text = res.text().await?;
            return Err(Error::Llm(format!("OpenAI API error: {}", text)));
        }

        let json_resp: serde_json::Value = res.json().await?;
        json_resp["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| Error::Llm("No content in OpenAI response".to_string()))
    }
}
