use super::LlmProvider;
use crate::errors::Error;
use crate::llm::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Provider implementation for a local Ollama server
#[derive(Debug)]
pub struct OllamaProvider {
    client: Client,
    /// Base URL of the server, `OLLAMA_HOST` or the default local port
    host: String,
    /// Model identifier to use (e.g. "llama3", "qwen2.5")
    model: String,
}

impl OllamaProvider {
    pub fn new(model: &str) -> Result<Self, Error> {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
        Ok(OllamaProvider {
            client: Client::new(),
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn call_llm_api(&self, messages: Vec<ChatMessage>, json_mode: bool) -> Result<String, Error> {
        let mut request_body = json!({
            "model": self.model,
            "stream": false,
            "messages": messages
        });
        if json_mode {
            request_body["format"] = json!("json");
        }

        let res = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request_body)
            .send()
            .await?;

        if !res.status().is_success() {
            let text = res.text().await?;
            return Err(Error::Llm(format!("Ollama API error: {}", text)));
        }

        let json_resp: serde_json::Value = res.json().await?;
        json_resp["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| Error::Llm("No content in Ollama response".to_string()))
    }
}
