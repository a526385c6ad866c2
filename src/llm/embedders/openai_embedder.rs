use super::Embedder;
use crate::errors::Error;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// OpenAI embedder implementation that uses OpenAI's API to generate text embeddings
#[derive(Debug)]
pub struct OpenAIEmbedder {
    client: Client,
    /// OpenAI API key used for authentication
    api_key: String,
    /// Name of the OpenAI model to use for embeddings
    pub model: String,
}

impl OpenAIEmbedder {
    /// Creates a new OpenAIEmbedder, failing if `OPENAI_API_KEY` is not set
    pub fn new(model: &str) -> Result<Self, Error> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| Error::MissingEnv("OPENAI_API_KEY"))?;
        Ok(Self {
            client: Client::new(),
            api_key,
            model: model.to_string(),
        })
    }

    async fn request(&self, input: Value) -> Result<Vec<Vec<f32>>, Error> {
        let body = json!({
            "input": input,
            "model": self.model
        });

        let res = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let txt = res.text().await?;
            return Err(Error::Embedding(format!("Error from OpenAI: {}", txt)));
        }

        let json_resp: Value = res.json().await?;
        let data = json_resp["data"]
            .as_array()
            .ok_or_else(|| Error::Embedding("No embedding data".to_string()))?;
        data.iter()
            .map(|item| {
                item["embedding"]
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|x| x.as_f64())
                            .map(|x| x as f32)
                            .collect()
                    })
                    .ok_or_else(|| Error::Embedding("No embedding".to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, Error> {
        self.request(json!(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(json!(texts)).await
    }
}
