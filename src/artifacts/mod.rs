mod http;
mod url_template;

pub use http::HttpArtifactService;
pub use url_template::UrlTemplateArtifactService;

use crate::config::ArtifactConfig;
use crate::core::MaskData;
use crate::errors::Error;
use async_trait::async_trait;
use std::sync::Arc;

/// Parameters passed along with a prompt to the artifact backend
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactOptions {
    /// Seed derived from the prompt text
    pub seed: u32,
    pub model: Option<String>,
    pub mask: Option<MaskData>,
}

/// Produces artifacts (generated or edited media) and returns a reference to them
#[async_trait]
pub trait ArtifactService: Send + Sync {
    async fn generate(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error>;

    async fn edit(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error>;
}

/// Builds the artifact backend selected in the configuration
pub fn artifact_service_from_config(config: &ArtifactConfig) -> Result<Arc<dyn ArtifactService>, Error> {
    match config.provider.as_str() {
        "url_template" => Ok(Arc::new(UrlTemplateArtifactService::new(&config.base_url)?)),
        "http" => Ok(Arc::new(HttpArtifactService::new(&config.base_url)?)),
        other => Err(Error::Config(format!("Unknown artifact provider '{}'", other))),
    }
}
