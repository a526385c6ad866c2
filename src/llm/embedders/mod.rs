/// Module for OpenAI embedder implementation
pub mod openai_embedder;
/// Module for the offline feature-hashing embedder
pub mod hashing_embedder;

use crate::config::EmbedderConfig;
use crate::errors::Error;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

pub use hashing_embedder::*;
pub use openai_embedder::*;

/// Trait defining interface for text embedding functionality
#[async_trait]
pub trait Embedder: Debug + Send + Sync {
    /// Embeds the given text into a vector of floating point numbers
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, Error>;

    /// Embeds several texts, preserving their order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_text(text).await?);
        }
        Ok(embeddings)
    }
}

/// Builds the embedder selected in the configuration
pub fn embedder_from_config(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>, Error> {
    match config.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(&config.model)?)),
        other => Err(Error::Config(format!("Unknown embedder provider '{}'", other))),
    }
}
